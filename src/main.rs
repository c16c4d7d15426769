//! Event Admission - Binary Entry Point
//!
//! Serves the HTTP API of the event admission services.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_admission::api::create_router;
use event_admission::{AppConfig, AppState, EntityStore, InMemoryStore, Journal, SystemClock, NAME, VERSION};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    info!(name = NAME, version = VERSION, bind = %config.bind_addr, app = %config.app_name, "starting");

    let store: Arc<dyn EntityStore> = match &config.data_dir {
        Some(dir) => {
            let journal = Journal::open(dir)?;
            let store = InMemoryStore::with_journal(journal)?;
            info!(
                data_dir = %dir.display(),
                events = store.event_count(),
                hits = store.hit_count(),
                "journal loaded"
            );
            Arc::new(store)
        }
        None => {
            warn!("EWM_DATA_DIR not set, state will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(store, Arc::new(SystemClock), config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(address = %bind_addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
