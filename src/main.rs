use anyhow::Result;
use notisync::{create_app_router, hub, jobs, state::AppState};
use shared::Config;
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

async fn shutdown_signal(bus_shutdown: tokio::sync::watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
    let _ = bus_shutdown.send(true);
}

#[tokio::main(flavor = "multi_thread", worker_threads = 8)]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!("configuration loaded");

    let hub_handle = hub::spawn();
    info!("hub actor started");

    let app_state = Arc::new(AppState::new(config, hub_handle.clone()).await?);
    info!("application state initialized");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    hub::spawn_bus_bridge(hub_handle, app_state.bus.clone(), shutdown_rx);
    info!("bus bridge started");

    let _scheduler = jobs::start_cleanup_scheduler(app_state.clone()).await?;
    info!("cleanup scheduler started");

    let app = create_app_router(app_state.clone());

    let port = app_state.config.app.service_port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    info!("server shutdown completed");

    Ok(())
}
