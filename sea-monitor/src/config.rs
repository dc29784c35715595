/**
 * CONFIGURATION SEA MONITOR
 *
 * Deux niveaux :
 * - Settings : paramètres de démarrage lus une fois (env + .env)
 * - OperatingConfig : paramètres métier relus à CHAQUE cycle et CHAQUE requête
 *   depuis la ConfigMap, jamais mis en cache (mode, MySQL, intervalle, réserve)
 *
 * Une valeur mal formée ne fait jamais échouer la lecture : elle est remplacée
 * par sa valeur par défaut et signalée en warn.
 */

use crate::error::{MonitorError, MonitorResult};
use crate::models::BYTES_PER_MB;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_NAMESPACE: &str = "monitor";
pub const DEFAULT_CONFIGMAP: &str = "mysql-config";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_RESERVE_MB: i64 = 1024;
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    PassiveServe,
    CollectAndServe,
}

impl Mode {
    /// `db` est l'ancienne valeur de la ConfigMap pour le mode collecte
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("collect-and-serve") | Some("db") => Mode::CollectAndServe,
            _ => Mode::PassiveServe,
        }
    }

    pub fn collects(self) -> bool {
        self == Mode::CollectAndServe
    }
}

/// Paramètres de connexion MySQL, chaînes opaques
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DbSettings {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl std::fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingConfig {
    pub mode: Mode,
    pub db: DbSettings,
    pub poll_interval: Duration,
    pub reserved_memory_bytes: i64,
}

impl Default for OperatingConfig {
    fn default() -> Self {
        Self {
            mode: Mode::PassiveServe,
            db: DbSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reserved_memory_bytes: DEFAULT_RESERVE_MB * BYTES_PER_MB,
        }
    }
}

impl OperatingConfig {
    /// Construit la config depuis les données brutes de la ConfigMap.
    /// Les valeurs invalides sont remplacées et retournées à part.
    pub fn from_data(data: &BTreeMap<String, String>) -> (Self, Vec<MonitorError>) {
        let mut issues = Vec::new();
        let text = |key: &str| data.get(key).cloned().unwrap_or_default();

        let poll_interval = match data.get("interval") {
            Some(raw) => match parse_interval(raw) {
                Ok(d) => d,
                Err(e) => {
                    issues.push(e);
                    DEFAULT_POLL_INTERVAL
                }
            },
            None => {
                issues.push(MonitorError::invalid_value("interval", "", "missing"));
                DEFAULT_POLL_INTERVAL
            }
        };

        let reserved_memory_bytes = match parse_reserve(data.get("reserve_mem").map(String::as_str)) {
            Ok(bytes) => bytes,
            Err(e) => {
                issues.push(e);
                DEFAULT_RESERVE_MB * BYTES_PER_MB
            }
        };

        let config = Self {
            mode: Mode::parse(data.get("mode").map(String::as_str)),
            db: DbSettings {
                host: text("host"),
                port: text("port"),
                user: text("user"),
                password: text("password"),
                database: text("database"),
            },
            poll_interval,
            reserved_memory_bytes,
        };
        (config, issues)
    }
}

fn parse_interval(raw: &str) -> MonitorResult<Duration> {
    let d = humantime::parse_duration(raw.trim())
        .map_err(|e| MonitorError::invalid_value("interval", raw, e))?;
    if d.is_zero() {
        return Err(MonitorError::invalid_value("interval", raw, "zero interval"));
    }
    Ok(d)
}

fn parse_reserve(raw: Option<&str>) -> MonitorResult<i64> {
    let raw = raw.unwrap_or_default();
    let mb: i64 = raw
        .trim()
        .parse()
        .map_err(|e| MonitorError::invalid_value("reserve_mem", raw, e))?;
    mb.checked_mul(BYTES_PER_MB)
        .ok_or_else(|| MonitorError::invalid_value("reserve_mem", raw, "overflow"))
}

/// Namespace de la ConfigMap : vide ou absent → "monitor"
pub fn resolve_namespace(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

/// Magasin clé/valeur externe (ConfigMap en production, fake en test)
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> MonitorResult<BTreeMap<String, String>>;
}

pub struct KubeConfigMapSource {
    api: Api<ConfigMap>,
    name: String,
}

impl KubeConfigMapSource {
    pub fn new(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl ConfigSource for KubeConfigMapSource {
    async fn fetch(&self) -> MonitorResult<BTreeMap<String, String>> {
        let cm = self
            .api
            .get(&self.name)
            .await
            .map_err(|e| MonitorError::ConfigFetch(format!("configmap {}: {e}", self.name)))?;
        Ok(cm.data.unwrap_or_default())
    }
}

/// Lecteur de config partagé par la boucle et l'API HTTP
#[derive(Clone)]
pub struct ConfigReader {
    source: Arc<dyn ConfigSource>,
}

impl ConfigReader {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self { source }
    }

    pub async fn read(&self) -> MonitorResult<OperatingConfig> {
        let data = self.source.fetch().await?;
        let (config, issues) = OperatingConfig::from_data(&data);
        for issue in issues {
            warn!("{issue}, using default");
        }
        Ok(config)
    }
}

/// Paramètres de démarrage du process
#[derive(Debug, Clone)]
pub struct Settings {
    pub namespace: String,
    pub configmap: String,
    pub http_addr: SocketAddr,
    pub api_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Variables vides traitées comme absentes
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_addr = var("SEA_HTTP_ADDR")
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.into())
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid SEA_HTTP_ADDR: {e}"))?;
        let api_timeout = match var("SEA_API_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("invalid SEA_API_TIMEOUT_SECS: {e}"))?;
                // 0 ferait expirer immédiatement chaque appel à l'API
                if secs == 0 {
                    anyhow::bail!("invalid SEA_API_TIMEOUT_SECS: zero timeout");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_API_TIMEOUT,
        };

        Ok(Self {
            namespace: resolve_namespace(var("POD_NAMESPACE")),
            configmap: var("SEA_CONFIGMAP").unwrap_or_else(|| DEFAULT_CONFIGMAP.into()),
            http_addr,
            api_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_full_config() {
        let (cfg, issues) = OperatingConfig::from_data(&data(&[
            ("mode", "db"),
            ("host", "mysql.monitor"),
            ("port", "3306"),
            ("user", "sea"),
            ("password", "secret"),
            ("database", "sea"),
            ("interval", "1m30s"),
            ("reserve_mem", "512"),
        ]));
        assert!(issues.is_empty());
        assert_eq!(cfg.mode, Mode::CollectAndServe);
        assert_eq!(cfg.db.host, "mysql.monitor");
        assert_eq!(cfg.poll_interval, Duration::from_secs(90));
        assert_eq!(cfg.reserved_memory_bytes, 512 * 1024 * 1024);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let (cfg, issues) = OperatingConfig::from_data(&data(&[
            ("interval", "abc"),
            ("reserve_mem", "xyz"),
        ]));
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.reserved_memory_bytes, 1_073_741_824);
        assert_eq!(issues.len(), 2);
        assert!(matches!(&issues[0], MonitorError::ConfigValueInvalid { key, .. } if key == "interval"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let (cfg, issues) = OperatingConfig::from_data(&data(&[("interval", "0s"), ("reserve_mem", "1")]));
        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_absent_mode_is_passive() {
        let (cfg, _) = OperatingConfig::from_data(&BTreeMap::new());
        assert_eq!(cfg.mode, Mode::PassiveServe);
        assert_eq!(Mode::parse(Some("collect-and-serve")), Mode::CollectAndServe);
        assert_eq!(Mode::parse(Some("passive-serve")), Mode::PassiveServe);
        assert_eq!(Mode::parse(Some("whatever")), Mode::PassiveServe);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = data(&[("mode", "db"), ("interval", "45s"), ("reserve_mem", "2048")]);
        assert_eq!(OperatingConfig::from_data(&raw), OperatingConfig::from_data(&raw));
    }

    #[test]
    fn test_resolve_namespace() {
        assert_eq!(resolve_namespace(None), "monitor");
        assert_eq!(resolve_namespace(Some("  ".into())), "monitor");
        assert_eq!(resolve_namespace(Some("prod".into())), "prod");
    }

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let env = data(pairs);
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_settings_defaults() {
        let s = settings(&[("SEA_CONFIGMAP", "")]).unwrap();
        assert_eq!(s.namespace, "monitor");
        assert_eq!(s.configmap, "mysql-config");
        assert_eq!(s.http_addr, DEFAULT_HTTP_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(s.api_timeout, DEFAULT_API_TIMEOUT);
    }

    #[test]
    fn test_api_timeout_must_be_positive() {
        let err = settings(&[("SEA_API_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("zero timeout"), "{err}");
        assert!(settings(&[("SEA_API_TIMEOUT_SECS", "-3")]).is_err());

        let s = settings(&[("SEA_API_TIMEOUT_SECS", "20")]).unwrap();
        assert_eq!(s.api_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_password_hidden_in_debug() {
        let db = DbSettings { password: "hunter2".into(), ..Default::default() };
        assert!(!format!("{db:?}").contains("hunter2"));
    }
}
