/**
 * ERREURS SEA MONITOR - Taxonomie unique des échecs du service
 *
 * RÔLE :
 * Une seule enum partagée par la config, l'échantillonneur, l'écriture MySQL
 * et l'API HTTP. Chaque variante correspond à une politique de reprise :
 *
 * - ConfigFetch        : fatal au démarrage, fallback sur l'ancienne config en boucle
 * - ConfigValueInvalid : jamais fatal, valeur par défaut substituée (warn)
 * - UpstreamList       : interrompt le cycle / la requête en cours seulement
 * - Quantity           : quantité illisible, le nœud concerné est ignoré
 * - Persistence        : loggé, la boucle continue
 * - MethodNotAllowed   : 405 côté HTTP
 */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("config fetch failed: {0}")]
    ConfigFetch(String),
    #[error("invalid value {value:?} for config key `{key}`: {reason}")]
    ConfigValueInvalid {
        key: String,
        value: String,
        reason: String,
    },
    #[error("{0}")]
    UpstreamList(String),
    #[error("invalid resource quantity {0:?}")]
    Quantity(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),
}

impl MonitorError {
    pub fn invalid_value(key: &str, value: &str, reason: impl ToString) -> Self {
        MonitorError::ConfigValueInvalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
