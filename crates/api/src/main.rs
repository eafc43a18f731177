use std::future::Future;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use racketfit_core::engine::EngineOptions;

mod app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = racketfit_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let backends = match racketfit_core::catalog::connect(&settings).await {
        Ok(b) => Some(b),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %format!("{e:#}"), "catalog unavailable; starting API in degraded mode");
            None
        }
    };

    let options = EngineOptions::from_env();
    tracing::info!(
        policy = ?options.policy,
        scope = ?options.scope,
        limit = options.limit,
        timeout = ?options.timeout,
        "recommendation engine configured"
    );

    let session_idle = std::env::var("SESSION_IDLE_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|n| *n >= 1)
        .map(Duration::from_secs)
        .unwrap_or(app::DEFAULT_SESSION_IDLE);

    let state = app::AppState::new(backends, options).with_session_idle(session_idle);
    let app = app::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}

/// Resolves when `signal` fires. If the handler could not be installed the error is logged and
/// the server keeps running instead of shutting down at once.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
}

fn init_sentry(settings: &racketfit_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
