//! Accès au cluster : listing des nœuds (capacité) et des métriques (consommation)
//!
//! `ClusterSource` est la frontière avec l'API Kubernetes ; `KubeClusterSource`
//! l'implémente avec kube-rs, les tests passent par un fake.

use crate::error::{MonitorError, MonitorResult};
use crate::models::{NodeCapacity, NodeUsage};
use crate::quantity::parse_bytes;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::ListParams;
use kube::{Api, Client};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Deux listings non ordonnés, indexés par nom de nœud
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn list_capacity(&self) -> MonitorResult<Vec<NodeCapacity>>;
    async fn list_usage(&self) -> MonitorResult<Vec<NodeUsage>>;
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct NodeMetricsUsage {
    #[serde(default)]
    pub cpu: Option<Quantity>,
    #[serde(default)]
    pub memory: Option<Quantity>,
}

/// Ressource `metrics.k8s.io/v1beta1` NodeMetrics (absente de k8s-openapi)
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct NodeMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
    pub usage: NodeMetricsUsage,
}

impl k8s_openapi::Resource for NodeMetrics {
    type Scope = k8s_openapi::ClusterResourceScope;

    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "NodeMetrics";
    const URL_PATH_SEGMENT: &'static str = "nodes";
    const VERSION: &'static str = "v1beta1";
}

impl k8s_openapi::Metadata for NodeMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

pub struct KubeClusterSource {
    nodes: Api<Node>,
    metrics: Api<NodeMetrics>,
}

impl KubeClusterSource {
    pub fn new(client: Client) -> Self {
        Self {
            nodes: Api::all(client.clone()),
            metrics: Api::all(client),
        }
    }
}

#[async_trait]
impl ClusterSource for KubeClusterSource {
    async fn list_capacity(&self) -> MonitorResult<Vec<NodeCapacity>> {
        let list = self
            .nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| MonitorError::UpstreamList(format!("error getting nodes: {e}")))?;

        Ok(list
            .items
            .iter()
            .filter_map(|node| {
                let name = node.metadata.name.clone()?;
                let allocatable = node.status.as_ref().and_then(|s| s.allocatable.as_ref());
                let memory_bytes = memory_of(&name, allocatable, "allocatable")?;
                Some(NodeCapacity { name, memory_bytes })
            })
            .collect())
    }

    async fn list_usage(&self) -> MonitorResult<Vec<NodeUsage>> {
        let list = self
            .metrics
            .list(&ListParams::default())
            .await
            .map_err(|e| MonitorError::UpstreamList(format!("error getting node metrics: {e}")))?;

        Ok(list
            .items
            .iter()
            .filter_map(|m| {
                let name = m.metadata.name.clone()?;
                let memory_bytes = match &m.usage.memory {
                    Some(q) => parse_or_warn(&name, q, "usage")?,
                    None => 0,
                };
                Some(NodeUsage { name, memory_bytes })
            })
            .collect())
    }
}

/// Mémoire absente = 0 octet ; quantité illisible = nœud écarté du listing
fn memory_of(node: &str, resources: Option<&BTreeMap<String, Quantity>>, what: &str) -> Option<i64> {
    match resources.and_then(|r| r.get("memory")) {
        Some(q) => parse_or_warn(node, q, what),
        None => Some(0),
    }
}

fn parse_or_warn(node: &str, q: &Quantity, what: &str) -> Option<i64> {
    match parse_bytes(&q.0) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(node, "skipping node, {what} memory: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_of_missing_key_is_zero() {
        let resources: BTreeMap<String, Quantity> =
            [("cpu".to_string(), Quantity("4".into()))].into_iter().collect();
        assert_eq!(memory_of("n1", Some(&resources), "allocatable"), Some(0));
        assert_eq!(memory_of("n1", None, "allocatable"), Some(0));
    }

    #[test]
    fn test_memory_of_parses_quantity() {
        let resources: BTreeMap<String, Quantity> =
            [("memory".to_string(), Quantity("16310476Ki".into()))].into_iter().collect();
        assert_eq!(memory_of("n1", Some(&resources), "allocatable"), Some(16_310_476 * 1024));
    }

    #[test]
    fn test_bad_quantity_skips_node() {
        assert_eq!(parse_or_warn("n1", &Quantity("lots".into()), "usage"), None);
    }

    #[test]
    fn test_node_metrics_deserialize() {
        let raw = serde_json::json!({
            "metadata": { "name": "worker-1" },
            "timestamp": "2024-05-01T10:00:00Z",
            "window": "20.036s",
            "usage": { "cpu": "137m", "memory": "1935264Ki" }
        });
        let m: NodeMetrics = serde_json::from_value(raw).unwrap();
        assert_eq!(m.metadata.name.as_deref(), Some("worker-1"));
        assert_eq!(m.usage.memory, Some(Quantity("1935264Ki".into())));
    }
}
