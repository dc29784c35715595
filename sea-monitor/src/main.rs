/**
 * SEA MONITOR - Point d'entrée du service
 *
 * RÔLE : construit les collaborateurs (client kube, ConfigMap, MySQL), lance la
 * boucle de collecte si le mode le demande, puis sert l'API HTTP.
 *
 * Tout échec au démarrage est fatal : pas de mode à moitié initialisé.
 */

use anyhow::Context;
use sea_monitor::config::KubeConfigMapSource;
use sea_monitor::http::{build_router, AppState};
use sea_monitor::{
    Collector, ConfigReader, HealthTracker, KubeClusterSource, MySqlSink, Sampler, Settings,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sea_monitor=info,tower_http=info")),
        )
        .init();

    info!("starting metrics service...");
    let settings = Settings::from_env()?;

    // client kube : in-cluster, ou kubeconfig local en dev
    let mut kube_config = kube::Config::infer()
        .await
        .context("failed to infer kube config")?;
    kube_config.connect_timeout = Some(settings.api_timeout);
    kube_config.read_timeout = Some(settings.api_timeout);
    let client = kube::Client::try_from(kube_config).context("failed to create kube client")?;

    let reader = ConfigReader::new(Arc::new(KubeConfigMapSource::new(
        client.clone(),
        &settings.namespace,
        &settings.configmap,
    )));
    let sampler = Sampler::new(Arc::new(KubeClusterSource::new(client)));
    let health = HealthTracker::new();

    let cfg = reader
        .read()
        .await
        .with_context(|| format!("failed to load config {}/{}", settings.namespace, settings.configmap))?;

    if cfg.mode.collects() {
        let sink = MySqlSink::connect(&cfg.db, settings.api_timeout)
            .await
            .context("failed to initialize database")?;
        Collector::new(reader.clone(), sampler.clone(), Arc::new(sink), health.clone()).spawn(cfg.clone());
    }

    let app = build_router(AppState { config: reader, sampler, health });

    info!(addr = %settings.http_addr, mode = ?cfg.mode, "starting HTTP server");
    let listener = TcpListener::bind(settings.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.http_addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("HTTP server failed")?;
    Ok(())
}
