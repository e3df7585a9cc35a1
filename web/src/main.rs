//! Pixwap HTTP server.
//!
//! Event photo sharing: owners create events and upload images, visitors
//! download them after leaving an email.

use anyhow::Context;
use pixwap_gallery::stores::file_cache::FileProfileCache;
use pixwap_gallery::{GalleryEnvironment, HttpBackend, SessionContext};
use pixwap_runtime::metrics::MetricsRecorder;
use pixwap_web::{AppState, Config, build_router};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the variables may come from the shell.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixwap=info,pixwap_web=info,pixwap_gallery=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pixwap HTTP server");

    // Load configuration
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        project_id = %config.firebase.project_id,
        cloud_name = %config.media.cloud_name,
        data_dir = ?config.storage.data_dir,
        "Configuration loaded"
    );

    // Metrics
    let mut recorder = MetricsRecorder::new();
    let recorder = match recorder.install() {
        Ok(()) => Some(recorder),
        Err(e) => {
            warn!(error = %e, "Metrics recorder not installed, /metrics disabled");
            None
        }
    };

    // Backend
    let cache = match &config.storage.data_dir {
        Some(dir) => FileProfileCache::in_dir(dir),
        None => FileProfileCache::default_location().context("No local data directory, set PIXWAP_DATA_DIR")?,
    };
    info!(path = %cache.path().display(), "Profile cache");

    let env = GalleryEnvironment::<HttpBackend>::connect(
        &config.firebase,
        config.media.clone(),
        cache,
        config.storage.credentials_path(),
    );

    // Session: resumes persisted credentials and starts following the
    // identity provider.
    let session = SessionContext::start(env.clone())
        .await
        .context("Failed to start the session")?;
    info!("Session started");

    let refresh = spawn_token_refresh(env.clone(), config.web.token_refresh_interval);

    let mut state = AppState::new(&env, session, config.web.clone());
    if let Some(recorder) = recorder {
        state = state.with_metrics(recorder);
    }
    let session = std::sync::Arc::clone(&state.session);
    let app = build_router(state);

    // Start server
    let addr = config.bind_address();
    info!("Server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped, draining workflows");
    refresh.abort();
    if let Err(e) = session.shutdown(config.server.shutdown_timeout).await {
        error!(error = %e, "Session did not drain in time");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Refresh the identity token before it expires.
fn spawn_token_refresh(env: GalleryEnvironment<HttpBackend>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = env.identity.refresh_session().await {
                warn!(error = %e, "Token refresh failed");
            }
        }
    })
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
