/*!
# Sea Monitor - Mémoire disponible des nœuds du cluster

Relève périodiquement la mémoire allouable et consommée de chaque nœud
(API `nodes` + `metrics.k8s.io`), en déduit la mémoire disponible,
l'archive dans MySQL et l'expose sur `GET /get_mem`.

Les collaborateurs externes (cluster, ConfigMap, MySQL) passent par des
traits injectés à la construction, remplaçables par les fakes du devkit.
*/

pub mod cluster;
pub mod collector;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod models;
pub mod persistence;
pub mod quantity;
pub mod sampler;

pub use cluster::{ClusterSource, KubeClusterSource};
pub use collector::{Collector, CycleOutcome, CycleReport};
pub use config::{ConfigReader, ConfigSource, Mode, OperatingConfig, Settings};
pub use error::{MonitorError, MonitorResult};
pub use health::HealthTracker;
pub use persistence::{MySqlSink, SampleSink, StoredSample};
pub use sampler::Sampler;
