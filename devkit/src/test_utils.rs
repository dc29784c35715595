/*!
Test Harness pour Sea Monitor

Câble les fakes (cluster, ConfigMap, MySQL) dans les vrais composants :
collecteur, échantillonneur et routeur HTTP.
*/

use crate::cluster_stub::FakeCluster;
use crate::store_stub::{FakeConfigStore, RecordingSink};
use axum::Router;
use sea_monitor::http::{build_router, AppState};
use sea_monitor::{Collector, ConfigReader, HealthTracker, Sampler};
use std::sync::Arc;

pub struct TestHarness {
    pub cluster: FakeCluster,
    pub config: FakeConfigStore,
    pub sink: RecordingSink,
    pub health: HealthTracker,
}

impl TestHarness {
    pub fn new(cluster: FakeCluster, config: FakeConfigStore) -> Self {
        init_test_logging();
        Self {
            cluster,
            config,
            sink: RecordingSink::new(),
            health: HealthTracker::new(),
        }
    }

    pub fn reader(&self) -> ConfigReader {
        ConfigReader::new(Arc::new(self.config.clone()))
    }

    pub fn sampler(&self) -> Sampler {
        Sampler::new(Arc::new(self.cluster.clone()))
    }

    pub fn collector(&self) -> Collector {
        Collector::new(
            self.reader(),
            self.sampler(),
            Arc::new(self.sink.clone()),
            self.health.clone(),
        )
    }

    pub fn router(&self) -> Router {
        build_router(AppState {
            config: self.reader(),
            sampler: self.sampler(),
            health: self.health.clone(),
        })
    }
}

/// Logs visibles avec `cargo test -- --nocapture`, init idempotente
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("sea_monitor=debug"))
        .with_test_writer()
        .try_init();
}
