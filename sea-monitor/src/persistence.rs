//! Écriture append-only des relevés dans MySQL
//!
//! Forme canonique : une ligne par cycle dans `sea_node_resource`,
//! colonne texte `mem_info` + horodatage serveur `collect_time`.

use crate::config::DbSettings;
use crate::error::{MonitorError, MonitorResult};
use crate::models::{render_mem_info, NodeSample};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::info;

const INSERT_SAMPLE: &str =
    "INSERT INTO sea_node_resource (mem_info, collect_time) VALUES (?, CURRENT_TIMESTAMP)";

/// Ligne persistée ; l'horodatage est attribué par le serveur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSample {
    pub mem_info: String,
}

impl StoredSample {
    pub fn from_samples(samples: &[NodeSample], reserved_memory_bytes: i64) -> Self {
        Self {
            mem_info: render_mem_info(samples, reserved_memory_bytes),
        }
    }
}

#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn append(&self, row: &StoredSample) -> MonitorResult<()>;
}

pub struct MySqlSink {
    pool: MySqlPool,
}

impl MySqlSink {
    /// Ouvre le pool et vérifie la connexion (fatal au démarrage si KO)
    pub async fn connect(db: &DbSettings, timeout: Duration) -> MonitorResult<Self> {
        let options = connect_options(db)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(|e| MonitorError::Persistence(format!("connect {}: {e}", db.host)))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| MonitorError::Persistence(format!("ping {}: {e}", db.host)))?;

        info!(host = %db.host, database = %db.database, "connected to MySQL");
        Ok(Self { pool })
    }
}

fn connect_options(db: &DbSettings) -> MonitorResult<MySqlConnectOptions> {
    let mut options = MySqlConnectOptions::new()
        .host(&db.host)
        .username(&db.user)
        .password(&db.password)
        .database(&db.database);
    if !db.port.trim().is_empty() {
        let port: u16 = db
            .port
            .trim()
            .parse()
            .map_err(|e| MonitorError::Persistence(format!("invalid port {:?}: {e}", db.port)))?;
        options = options.port(port);
    }
    Ok(options)
}

#[async_trait]
impl SampleSink for MySqlSink {
    async fn append(&self, row: &StoredSample) -> MonitorResult<()> {
        sqlx::query(INSERT_SAMPLE)
            .bind(&row.mem_info)
            .execute(&self.pool)
            .await
            .map_err(|e| MonitorError::Persistence(format!("insert {:?}: {e}", row.mem_info)))?;
        Ok(())
    }
}
