/**
 * SANTÉ DU SERVICE - Compteurs de la boucle de collecte
 *
 * - Phase courante (idle / sampling / writing / sleeping)
 * - Cycles réussis, échecs d'échantillonnage, échecs d'écriture, replis de config
 * - Dernier relevé stocké et dernière erreur, horodatés RFC 3339
 *
 * Exposé sur /system/health ; /get_mem n'en lit jamais rien.
 * Compteurs atomiques, le dernier cycle sous Mutex parking_lot.
 */

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Phases de la boucle de collecte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Sampling,
    Writing,
    Sleeping,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub uptime_seconds: u64,
    pub collection_enabled: bool,
    pub phase: Phase,
    pub cycles_completed: u64,
    pub sample_failures: u64,
    pub write_failures: u64,
    pub config_fallbacks: u64,
    pub last_cycle_at: Option<String>,
    pub last_mem_info: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct LastCycle {
    phase: Phase,
    at: Option<OffsetDateTime>,
    mem_info: Option<String>,
    error: Option<String>,
}

/// Compteurs de la boucle, lus par `/system/health`.
/// N'alimente jamais `/get_mem`, qui recalcule tout.
#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    collection_enabled: Arc<AtomicBool>,
    cycles_completed: Arc<AtomicU64>,
    sample_failures: Arc<AtomicU64>,
    write_failures: Arc<AtomicU64>,
    config_fallbacks: Arc<AtomicU64>,
    last: Arc<parking_lot::Mutex<LastCycle>>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            collection_enabled: Arc::new(AtomicBool::new(false)),
            cycles_completed: Arc::new(AtomicU64::new(0)),
            sample_failures: Arc::new(AtomicU64::new(0)),
            write_failures: Arc::new(AtomicU64::new(0)),
            config_fallbacks: Arc::new(AtomicU64::new(0)),
            last: Arc::new(parking_lot::Mutex::new(LastCycle {
                phase: Phase::Idle,
                at: None,
                mem_info: None,
                error: None,
            })),
        }
    }

    pub fn mark_collection_enabled(&self) {
        self.collection_enabled.store(true, Ordering::Relaxed);
    }

    pub fn set_phase(&self, phase: Phase) {
        self.last.lock().phase = phase;
    }

    pub fn record_config_fallback(&self) {
        self.config_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self, mem_info: &str) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last.lock();
        last.at = Some(OffsetDateTime::now_utc());
        last.mem_info = Some(mem_info.to_string());
        last.error = None;
    }

    pub fn record_sample_failure(&self, error: &str) {
        self.sample_failures.fetch_add(1, Ordering::Relaxed);
        self.record_failure(error);
    }

    pub fn record_write_failure(&self, error: &str) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
        self.record_failure(error);
    }

    fn record_failure(&self, error: &str) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last.lock();
        last.at = Some(OffsetDateTime::now_utc());
        last.error = Some(error.to_string());
    }

    pub fn get_health(&self) -> ServiceHealth {
        let last = self.last.lock();
        ServiceHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            collection_enabled: self.collection_enabled.load(Ordering::Relaxed),
            phase: last.phase,
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            sample_failures: self.sample_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            config_fallbacks: self.config_fallbacks.load(Ordering::Relaxed),
            last_cycle_at: last.at.and_then(|t| t.format(&Rfc3339).ok()),
            last_mem_info: last.mem_info.clone(),
            last_error: last.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let health = HealthTracker::new();
        health.record_stored("10_1024");
        health.record_write_failure("insert failed");
        health.record_sample_failure("metrics down");
        health.record_config_fallback();
        health.set_phase(Phase::Sleeping);

        let h = health.get_health();
        assert_eq!(h.cycles_completed, 3);
        assert_eq!(h.write_failures, 1);
        assert_eq!(h.sample_failures, 1);
        assert_eq!(h.config_fallbacks, 1);
        assert_eq!(h.phase, Phase::Sleeping);
        assert_eq!(h.last_mem_info.as_deref(), Some("10_1024"));
        assert_eq!(h.last_error.as_deref(), Some("metrics down"));
        assert!(h.last_cycle_at.is_some());
        assert!(!h.collection_enabled);
    }

    #[test]
    fn test_success_clears_last_error() {
        let health = HealthTracker::new();
        health.record_write_failure("boom");
        health.record_stored("1_2");
        assert_eq!(health.get_health().last_error, None);
    }
}
