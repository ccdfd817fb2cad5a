use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

use sentiment_server::cli;
use sentiment_server::config::{Command, Config};
use sentiment_server::loader;
use sentiment_server::server::{AppState, router};
use sentiment_server::service::PredictionService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sentiment_server=debug".into());
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!("Starting with config: {:?}", config);

    // Artifacts are loaded exactly once, before anything can call the service.
    let source = config.artifact_source();
    tracing::info!("Loading model artifacts from {}", source);
    let artifacts = loader::load(source.as_ref(), &config.artifact_files()).await;
    let service = Arc::new(
        PredictionService::new(artifacts).with_max_batch_size(config.max_batch_size),
    );

    match config.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, service).await,
        Command::Predict { texts, json } => {
            let texts = cli::read_texts(texts, std::io::stdin().lock())?;
            cli::run(
                &service,
                &source.to_string(),
                texts,
                json,
                std::io::stdout().lock(),
            )
        }
    }
}

async fn serve(config: &Config, service: Arc<PredictionService>) -> anyhow::Result<()> {
    if !service.is_ready() {
        tracing::warn!("Model artifacts unavailable, /predict will answer 503");
    }

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = router(AppState::new(service))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());
    tracing::info!("Max batch size: {}", config.max_batch_size);

    axum::serve(listener, app).await?;
    Ok(())
}
