/**
 * API HTTP SEA MONITOR
 *
 * ROUTES :
 * - GET /get_mem        : relevé instantané `<memMB_1>_..._<memMB_N>_<reservedMB>`
 * - GET /health         : "ok"
 * - GET /system/health  : compteurs de la boucle de collecte (JSON)
 *
 * `/get_mem` recalcule tout à chaque appel (échantillonneur + config fraîche),
 * sans rien lire de la boucle. Tout autre verbe → 405.
 * Pas d'authentification : service interne au cluster.
 */

use crate::config::ConfigReader;
use crate::error::MonitorError;
use crate::health::{HealthTracker, ServiceHealth};
use crate::models::render_mem_info;
use crate::sampler::Sampler;
use axum::extract::{ConnectInfo, State};
use axum::http::{Extensions, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::net::SocketAddr;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: ConfigReader,
    pub sampler: Sampler,
    pub health: HealthTracker,
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        match &self {
            MonitorError::MethodNotAllowed(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
            }
            MonitorError::ConfigFetch(_) | MonitorError::ConfigValueInvalid { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error loading config: {self}"),
            )
                .into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error getting memory metrics: {self}"),
            )
                .into_response(),
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/get_mem", get(get_mem).fallback(method_not_allowed))
        .with_state(app_state)
}

fn client_addr(ext: &Extensions) -> String {
    ext.get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".into())
}

// GET /get_mem
async fn get_mem(
    State(app): State<AppState>,
    method: Method,
    ext: Extensions,
) -> Result<String, MonitorError> {
    // axum route aussi HEAD vers le handler GET
    if method != Method::GET {
        return Err(method_not_allowed(method, ext).await);
    }
    let client = client_addr(&ext);
    info!(%client, "received memory request");

    let samples = app.sampler.sample().await.inspect_err(|e| {
        error!(%client, "error getting memory metrics: {e}");
    })?;
    let cfg = app.config.read().await.inspect_err(|e| {
        error!(%client, "error loading config: {e}");
    })?;

    let response = render_mem_info(&samples, cfg.reserved_memory_bytes);
    info!(%client, %response, "sending memory info");
    Ok(response)
}

async fn method_not_allowed(method: Method, ext: Extensions) -> MonitorError {
    warn!(client = %client_addr(&ext), %method, "invalid request method");
    MonitorError::MethodNotAllowed(method.to_string())
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<ServiceHealth> {
    Json(app.health.get_health())
}
