use serde::Serialize;

pub const BYTES_PER_MB: i64 = 1024 * 1024;

/// Capacité allouable d'un nœud (listing `nodes`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCapacity {
    pub name: String,
    pub memory_bytes: i64,
}

/// Consommation courante d'un nœud (listing `metrics.k8s.io`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUsage {
    pub name: String,
    pub memory_bytes: i64,
}

/// Mesure d'un nœud pour une passe d'échantillonnage, jamais conservée entre deux cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSample {
    pub identity: String,
    pub total_memory_bytes: i64,
    /// Négatif en cas de surallocation
    pub available_memory_bytes: i64,
}

/// Format `<memMB_1>_..._<memMB_N>_<reservedMB>` partagé par MySQL et `/get_mem`
pub fn render_mem_info(samples: &[NodeSample], reserved_memory_bytes: i64) -> String {
    samples
        .iter()
        .map(|s| s.available_memory_bytes / BYTES_PER_MB)
        .chain(std::iter::once(reserved_memory_bytes / BYTES_PER_MB))
        .map(|mb| mb.to_string())
        .collect::<Vec<_>>()
        .join("_")
}
