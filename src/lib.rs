pub mod access;
pub mod auth;
pub mod boards;
pub mod config;
pub mod database;
pub mod deadline;
pub mod errors;
pub mod groups;
pub mod models;
pub mod profile;
pub mod responses;
pub mod router;
pub mod sessions;
pub mod state;
pub mod telemetry;
pub mod utils;
pub mod website;

use axum::{extract::Request, ServiceExt};
use tokio::{net::TcpListener, signal};

pub use config::{Env, WebsiteConfig};
pub use errors::{AppError, AppResult};
pub use router::app;
pub use state::WebsiteState;

use telemetry::init_tracing;

pub fn run(config: WebsiteConfig) -> std::io::Result<()> {
    let _guards = init_tracing(&config.env, config.sentry_dsn());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(config.worker_threads)
        .max_blocking_threads(config.max_blocking_threads)
        .build()?
        .block_on(serve(config))
}

pub async fn serve(config: WebsiteConfig) -> std::io::Result<()> {
    let state = WebsiteState::new(config);
    state.database().run_migrations().await;
    tokio::fs::create_dir_all(state.config().uploads_dir()).await?;

    let listener = TcpListener::bind(state.config().socket_addr()).await?;
    tracing::info!(address = %listener.local_addr()?, env = %state.config().env, "listening");

    let app = app(state);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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

    tracing::info!("shutting down");
}
