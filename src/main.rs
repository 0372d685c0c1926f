use crosssell_mlops::{
    api::{build_router, AppState},
    config::Config,
    tracking::{MlflowClient, ModelRegistry},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "crosssell_mlops={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting cross-sell MLOps API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Tracking server: {}", config.tracking.uri);

    let config = Arc::new(config);
    let client = MlflowClient::new(&config.tracking)?;
    let registry = Arc::new(ModelRegistry::new(client, config.tracking.clone()));

    // Ensure the experiment exists; a dead tracking server must not stop
    // the API from starting
    match registry.ensure_experiment().await {
        Ok(experiment_id) => {
            tracing::info!(
                experiment = %registry.experiment_name(),
                experiment_id = %experiment_id,
                "Experiment ready"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not prepare experiment, continuing");
        }
    }

    let app_state = AppState::new(config.clone(), registry.clone());

    // Warm the model slot from whatever production run is already logged
    let initial = registry.load_best_model().await;
    app_state.model.replace(initial).await;

    let app = build_router(app_state);

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Training:     http://{}/train", http_addr);
    tracing::info!("   Predictions:  http://{}/predict", http_addr);

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
        })
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
