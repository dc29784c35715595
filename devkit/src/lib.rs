/*!
# Sea DevKit - Fakes et utilitaires de test

Permet de faire tourner Sea Monitor sans cluster ni MySQL :
- Faux cluster (listings nœuds / métriques, pannes simulables)
- Fausse ConfigMap modifiable entre deux cycles
- Puits MySQL qui enregistre les lignes
- Harness qui câble le tout dans le collecteur et le routeur HTTP
*/

pub mod cluster_stub;
pub mod store_stub;
pub mod test_utils;

pub use cluster_stub::{FakeCluster, MIB};
pub use store_stub::{FakeConfigStore, RecordingSink};
pub use test_utils::TestHarness;
