use anyhow::{Context, Result};
use slit_planner::api::{self, AppState};
use slit_planner::config::Config;
use slit_planner::logging;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

async fn serve(config: Config) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(config.open_workshop());

    let app = api::router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    eprintln!("Listening on {addr}");
    tracing::info!(
        data_dir = %config.data_dir.display(),
        kerf_mm = config.kerf_mm,
        trim_margin_mm = config.trim_margin_mm,
        "server started"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn main() -> Result<()> {
    let config = Config::from_env()?;
    logging::init_file("development.log", &config.rust_log)?;

    // Sentry must be up before the runtime spawns worker threads.
    let _sentry = sentry::init((
        config.sentry_dsn.clone(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(config))
}
