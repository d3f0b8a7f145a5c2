//! topic-registrar entry point.
//!
//! Starts the registrar service, the replication loop on the front-end
//! node, and the read-only HTTP admin surface.

use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use topic_registrar::api;
use topic_registrar::app_state::AppState;
use topic_registrar::client::DiscoveryService;
use topic_registrar::config::RegistrarConfig;
use topic_registrar::domain::RegistrationStore;
use topic_registrar::service::{RegistrarService, ReplicationLoop};
use topic_registrar::transport::ConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = RegistrarConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::info!(
        addr = %config.listen_addr,
        admin = %config.admin_addr,
        front_end = config.front_end,
        "starting topic-registrar"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let store = Arc::new(RegistrationStore::new());
    let manager = Arc::new(
        ConnectionManager::new(config.timeouts, config.proxy_check_timeout)
            .with_cancellation(shutdown_rx.clone()),
    );

    let registrar = RegistrarService::bind(config.listen_addr, Arc::clone(&store)).await?;

    let replication = if config.front_end {
        let replication = ReplicationLoop::new(
            Arc::clone(&store),
            config.local_registrars.clone(),
            DiscoveryService::new(Arc::clone(&manager)),
            config.replication_interval,
        );
        Some(replication.start())
    } else {
        None
    };

    let app_state = match &replication {
        Some(handle) => AppState::front_end(Arc::clone(&store), handle.monitor()),
        None => AppState::local(Arc::clone(&store)),
    };
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.admin_addr).await?;
    tracing::info!(addr = %config.admin_addr, "admin server listening");

    let registrar_task = tokio::spawn(registrar.run_until(wait_for(shutdown_rx.clone())));
    let admin_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for(shutdown_rx))
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    if let Some(handle) = replication {
        handle.stop().await;
    }
    registrar_task.await??;
    admin_task.await??;
    manager.shutdown();

    tracing::info!("topic-registrar stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix. The only signal handling in the
/// process.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl-C"),
            Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("received SIGTERM");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
