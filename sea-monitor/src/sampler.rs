/**
 * ÉCHANTILLONNEUR - Mémoire disponible par nœud
 *
 * FONCTIONNEMENT :
 * - Récupère en parallèle le listing capacité (nodes) et consommation (metrics)
 * - Jointure par nom de nœud, premier match gagnant si doublon côté metrics
 * - Un nœud sans métrique est ignoré silencieusement (lag du metrics-server)
 * - disponible = capacité - consommation, sans borne à zéro (surallocation)
 * - Soustraction hors plage i64 → nœud ignoré avec un warn
 * - L'ordre du listing capacité est conservé
 *
 * Pas d'état : chaque appel repart de zéro.
 */

use crate::cluster::ClusterSource;
use crate::error::MonitorResult;
use crate::models::{NodeCapacity, NodeSample, NodeUsage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Sampler {
    cluster: Arc<dyn ClusterSource>,
}

impl Sampler {
    pub fn new(cluster: Arc<dyn ClusterSource>) -> Self {
        Self { cluster }
    }

    pub async fn sample(&self) -> MonitorResult<Vec<NodeSample>> {
        let (usage, capacity) = tokio::try_join!(self.cluster.list_usage(), self.cluster.list_capacity())?;
        let samples = join_samples(&capacity, &usage);
        debug!(
            nodes = capacity.len(),
            with_metrics = samples.len(),
            "sampled node memory"
        );
        Ok(samples)
    }
}

/// Jointure capacité × consommation par nom
pub fn join_samples(capacity: &[NodeCapacity], usage: &[NodeUsage]) -> Vec<NodeSample> {
    let mut used_by_name: HashMap<&str, i64> = HashMap::with_capacity(usage.len());
    for u in usage {
        used_by_name.entry(u.name.as_str()).or_insert(u.memory_bytes);
    }

    capacity
        .iter()
        .filter_map(|node| {
            let used = *used_by_name.get(node.name.as_str())?;
            let Some(available) = node.memory_bytes.checked_sub(used) else {
                warn!(node = %node.name, capacity = node.memory_bytes, used, "skipping node, available memory overflows");
                return None;
            };
            Some(NodeSample {
                identity: node.name.clone(),
                total_memory_bytes: node.memory_bytes,
                available_memory_bytes: available,
            })
        })
        .collect()
}
