/**
 * BOUCLE DE COLLECTE - Relevé périodique vers MySQL
 *
 * CYCLE : Idle → Sampling → Writing → Sleeping → Sampling ...
 *
 * - Config relue au début de chaque cycle ; un changement d'intervalle ou de
 *   mode s'applique au cycle suivant, jamais en cours de cycle
 * - Config illisible → dernière config valide pour CE cycle uniquement
 * - Mode passif → pas de relevé, on dort et on relit au cycle suivant
 * - Échec de l'échantillonneur ou de l'écriture : loggé, la boucle continue
 *
 * Seule la phase Sleeping suspend la tâche.
 */

use crate::config::{ConfigReader, OperatingConfig};
use crate::health::{HealthTracker, Phase};
use crate::persistence::{SampleSink, StoredSample};
use crate::sampler::Sampler;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Stored(String),
    Passive,
    SampleFailed(String),
    WriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub config_fallback: bool,
    pub sleep_for: Duration,
}

pub struct Collector {
    reader: ConfigReader,
    sampler: Sampler,
    sink: Arc<dyn SampleSink>,
    health: HealthTracker,
}

impl Collector {
    pub fn new(
        reader: ConfigReader,
        sampler: Sampler,
        sink: Arc<dyn SampleSink>,
        health: HealthTracker,
    ) -> Self {
        Self { reader, sampler, sink, health }
    }

    /// Un cycle complet hors sommeil ; `last_good` est mis à jour si la relecture réussit
    pub async fn run_cycle(&self, last_good: &mut OperatingConfig) -> CycleReport {
        let mut config_fallback = false;
        let cfg = match self.reader.read().await {
            Ok(cfg) => {
                *last_good = cfg.clone();
                cfg
            }
            Err(e) => {
                warn!("error reloading config: {e}, using previous config");
                self.health.record_config_fallback();
                config_fallback = true;
                last_good.clone()
            }
        };
        let sleep_for = cfg.poll_interval;

        if !cfg.mode.collects() {
            self.health.set_phase(Phase::Idle);
            debug!("passive mode, skipping collection");
            return CycleReport { outcome: CycleOutcome::Passive, config_fallback, sleep_for };
        }

        self.health.set_phase(Phase::Sampling);
        let samples = match self.sampler.sample().await {
            Ok(samples) => samples,
            Err(e) => {
                error!("error collecting metrics: {e}");
                self.health.record_sample_failure(&e.to_string());
                return CycleReport {
                    outcome: CycleOutcome::SampleFailed(e.to_string()),
                    config_fallback,
                    sleep_for,
                };
            }
        };

        self.health.set_phase(Phase::Writing);
        let row = StoredSample::from_samples(&samples, cfg.reserved_memory_bytes);
        let outcome = match self.sink.append(&row).await {
            Ok(()) => {
                info!(mem_info = %row.mem_info, "inserted metrics");
                self.health.record_stored(&row.mem_info);
                CycleOutcome::Stored(row.mem_info)
            }
            Err(e) => {
                error!(mem_info = %row.mem_info, "error inserting metrics: {e}");
                self.health.record_write_failure(&e.to_string());
                CycleOutcome::WriteFailed(e.to_string())
            }
        };

        CycleReport { outcome, config_fallback, sleep_for }
    }

    /// Boucle infinie ; ne se termine qu'avec le process
    pub async fn run(self, initial: OperatingConfig) {
        let mut last_good = initial;
        loop {
            let report = self.run_cycle(&mut last_good).await;
            self.health.set_phase(Phase::Sleeping);
            debug!(sleep_ms = report.sleep_for.as_millis() as u64, "cycle done");
            tokio::time::sleep(report.sleep_for).await;
        }
    }

    pub fn spawn(self, initial: OperatingConfig) -> JoinHandle<()> {
        self.health.mark_collection_enabled();
        info!(interval = ?initial.poll_interval, "starting metrics collection");
        tokio::spawn(self.run(initial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterSource;
    use crate::config::{ConfigSource, Mode};
    use crate::error::{MonitorError, MonitorResult};
    use crate::models::{NodeCapacity, NodeUsage};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    const MIB: i64 = 1024 * 1024;

    struct StaticConfig(Option<BTreeMap<String, String>>);

    #[async_trait]
    impl ConfigSource for StaticConfig {
        async fn fetch(&self) -> MonitorResult<BTreeMap<String, String>> {
            self.0
                .clone()
                .ok_or_else(|| MonitorError::ConfigFetch("configmap mysql-config: not found".into()))
        }
    }

    struct TwoNodes;

    #[async_trait]
    impl ClusterSource for TwoNodes {
        async fn list_capacity(&self) -> MonitorResult<Vec<NodeCapacity>> {
            Ok(vec![
                NodeCapacity { name: "n1".into(), memory_bytes: 4096 * MIB },
                NodeCapacity { name: "n2".into(), memory_bytes: 4096 * MIB },
            ])
        }
        async fn list_usage(&self) -> MonitorResult<Vec<NodeUsage>> {
            Ok(vec![
                NodeUsage { name: "n1".into(), memory_bytes: 2048 * MIB },
                NodeUsage { name: "n2".into(), memory_bytes: 3072 * MIB },
            ])
        }
    }

    struct NullSink(bool);

    #[async_trait]
    impl SampleSink for NullSink {
        async fn append(&self, _row: &StoredSample) -> MonitorResult<()> {
            if self.0 {
                Ok(())
            } else {
                Err(MonitorError::Persistence("connection reset".into()))
            }
        }
    }

    fn data(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
        Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn collector(data: Option<BTreeMap<String, String>>, sink_ok: bool) -> Collector {
        Collector::new(
            ConfigReader::new(Arc::new(StaticConfig(data))),
            Sampler::new(Arc::new(TwoNodes)),
            Arc::new(NullSink(sink_ok)),
            HealthTracker::new(),
        )
    }

    #[tokio::test]
    async fn test_cycle_stores_summary() {
        let c = collector(data(&[("mode", "db"), ("interval", "10s"), ("reserve_mem", "512")]), true);
        let mut last = OperatingConfig::default();
        let report = c.run_cycle(&mut last).await;
        assert_eq!(report.outcome, CycleOutcome::Stored("2048_1024_512".into()));
        assert_eq!(report.sleep_for, Duration::from_secs(10));
        assert_eq!(last.mode, Mode::CollectAndServe);
    }

    #[tokio::test]
    async fn test_config_failure_uses_previous() {
        let c = collector(None, true);
        let mut last = OperatingConfig {
            mode: Mode::CollectAndServe,
            poll_interval: Duration::from_secs(5),
            ..OperatingConfig::default()
        };
        let report = c.run_cycle(&mut last).await;
        assert!(report.config_fallback);
        assert_eq!(report.sleep_for, Duration::from_secs(5));
        assert_eq!(report.outcome, CycleOutcome::Stored("2048_1024_1024".into()));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_fatal() {
        let c = collector(data(&[("mode", "db"), ("interval", "10s")]), false);
        let mut last = OperatingConfig::default();
        let report = c.run_cycle(&mut last).await;
        assert!(matches!(report.outcome, CycleOutcome::WriteFailed(_)));
        assert_eq!(report.sleep_for, Duration::from_secs(10));
        assert_eq!(c.health.get_health().write_failures, 1);
    }

    #[tokio::test]
    async fn test_passive_mode_skips() {
        let c = collector(data(&[("mode", "passive-serve"), ("interval", "1m")]), true);
        let mut last = OperatingConfig::default();
        let report = c.run_cycle(&mut last).await;
        assert_eq!(report.outcome, CycleOutcome::Passive);
        assert_eq!(report.sleep_for, Duration::from_secs(60));
    }
}
