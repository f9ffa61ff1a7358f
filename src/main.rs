//! Squad Herald binary entrypoint wiring signal ingestion, the tracker
//! engine, and the command REST surface.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::registry::{JsonRegistryStore, Registry, RegistryStore};
use dao::valorant::{HttpMatchSource, MatchSource};
use services::announcer::Announcer;
use services::delivery::{AnnouncementSink, GatewaySink};
use services::engine;
use services::resolver::ResolveContext;
use state::AppState;
use state::ledger::AnnouncementLedger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::load());

    let store: Arc<dyn RegistryStore> =
        Arc::new(JsonRegistryStore::new(config.storage.data_dir.clone()));
    let registry = Registry::load(store).await.context("loading registry")?;
    info!(
        registered_users = registry.registered_users().await,
        tracked_guilds = registry.tracked_guilds().await,
        "registry loaded"
    );

    let match_source: Arc<dyn MatchSource> = Arc::new(
        HttpMatchSource::new(&config.provider, &config.fetch)
            .context("building match provider client")?,
    );
    let sink: Arc<dyn AnnouncementSink> = Arc::new(
        GatewaySink::new(&config.gateway, registry.clone()).context("building delivery sink")?,
    );
    let announcer = Announcer::new(Arc::new(AnnouncementLedger::new()), sink);

    let engine = engine::spawn(ResolveContext {
        config,
        registry: registry.clone(),
        source: match_source.clone(),
        announcer,
    });

    let app_state = AppState::new(registry, engine, match_source);
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
