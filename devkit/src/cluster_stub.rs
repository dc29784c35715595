/*!
Faux cluster pour tests sans API Kubernetes

Les listings capacité / consommation sont modifiables à chaud et chaque
listing peut être mis en panne indépendamment. Les appels sont comptés.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_monitor::models::{NodeCapacity, NodeUsage};
use sea_monitor::{ClusterSource, MonitorError, MonitorResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const MIB: i64 = 1024 * 1024;

#[derive(Default)]
struct Inner {
    capacity: Mutex<Vec<NodeCapacity>>,
    usage: Mutex<Vec<NodeUsage>>,
    fail_nodes: AtomicBool,
    fail_metrics: AtomicBool,
    calls: AtomicUsize,
}

/// Faux `ClusterSource`, clonable (état partagé)
#[derive(Clone, Default)]
pub struct FakeCluster {
    inner: Arc<Inner>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un nœud présent dans les deux listings (valeurs en MiB)
    pub fn with_node(self, name: &str, capacity_mb: i64, used_mb: i64) -> Self {
        self.add_capacity(name, capacity_mb);
        self.add_usage(name, used_mb);
        self
    }

    /// Nœud sans métrique (metrics-server en retard)
    pub fn with_unmetered_node(self, name: &str, capacity_mb: i64) -> Self {
        self.add_capacity(name, capacity_mb);
        self
    }

    pub fn add_capacity(&self, name: &str, capacity_mb: i64) {
        self.inner.capacity.lock().push(NodeCapacity {
            name: name.to_string(),
            memory_bytes: capacity_mb * MIB,
        });
    }

    pub fn add_usage(&self, name: &str, used_mb: i64) {
        self.inner.usage.lock().push(NodeUsage {
            name: name.to_string(),
            memory_bytes: used_mb * MIB,
        });
    }

    /// Change la consommation d'un nœud existant
    pub fn set_usage(&self, name: &str, used_mb: i64) {
        for u in self.inner.usage.lock().iter_mut().filter(|u| u.name == name) {
            u.memory_bytes = used_mb * MIB;
        }
    }

    pub fn fail_nodes(&self, fail: bool) {
        self.inner.fail_nodes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_metrics(&self, fail: bool) {
        self.inner.fail_metrics.store(fail, Ordering::SeqCst);
    }

    /// Nombre total d'appels de listing (capacité + consommation)
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterSource for FakeCluster {
    async fn list_capacity(&self) -> MonitorResult<Vec<NodeCapacity>> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_nodes.load(Ordering::SeqCst) {
            return Err(MonitorError::UpstreamList("error getting nodes: [fake] unavailable".into()));
        }
        Ok(self.inner.capacity.lock().clone())
    }

    async fn list_usage(&self) -> MonitorResult<Vec<NodeUsage>> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_metrics.load(Ordering::SeqCst) {
            return Err(MonitorError::UpstreamList(
                "error getting node metrics: [fake] unavailable".into(),
            ));
        }
        Ok(self.inner.usage.lock().clone())
    }
}
