/*!
Faux magasins : ConfigMap en mémoire et puits MySQL qui enregistre les lignes
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_monitor::{ConfigSource, MonitorError, MonitorResult, SampleSink, StoredSample};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// ConfigMap simulée ; `None` = entrée absente (ConfigFetch)
#[derive(Clone)]
pub struct FakeConfigStore {
    data: Arc<Mutex<Option<BTreeMap<String, String>>>>,
    reads: Arc<AtomicUsize>,
}

impl FakeConfigStore {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self {
            data: Arc::new(Mutex::new(Some(map))),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Config de collecte typique
    pub fn collecting(interval: &str, reserve_mb: &str) -> Self {
        Self::new(&[
            ("mode", "collect-and-serve"),
            ("host", "mysql.monitor.svc"),
            ("port", "3306"),
            ("user", "sea"),
            ("password", "sea"),
            ("database", "sea"),
            ("interval", interval),
            ("reserve_mem", reserve_mb),
        ])
    }

    pub fn set(&self, key: &str, value: &str) {
        if let Some(map) = self.data.lock().as_mut() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    /// Simule la suppression de la ConfigMap
    pub fn remove_entry(&self) {
        *self.data.lock() = None;
    }

    pub fn restore_entry(&self, pairs: &[(&str, &str)]) {
        *self.data.lock() = Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for FakeConfigStore {
    async fn fetch(&self) -> MonitorResult<BTreeMap<String, String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.data
            .lock()
            .clone()
            .ok_or_else(|| MonitorError::ConfigFetch("configmap mysql-config: [fake] not found".into()))
    }
}

/// Puits qui garde chaque ligne reçue, avec panne simulable
#[derive(Clone, Default)]
pub struct RecordingSink {
    rows: Arc<Mutex<Vec<StoredSample>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<String> {
        self.rows.lock().iter().map(|r| r.mem_info.clone()).collect()
    }

    /// Tentatives d'écriture, réussies ou non
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleSink for RecordingSink {
    async fn append(&self, row: &StoredSample) -> MonitorResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MonitorError::Persistence("[fake] connection refused".into()));
        }
        self.rows.lock().push(row.clone());
        Ok(())
    }
}
