//! Two-page operator dashboard served as static HTML over axum.
//!
//! The backend and tracking URLs are injected into the embedded pages at
//! request time, so one container image works across environments.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use clap::Parser;
use serde::Deserialize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HOME_PAGE: &str = include_str!("../../assets/dashboard/home.html");
const DEMO_PAGE: &str = include_str!("../../assets/dashboard/demomlops3.html");

#[derive(Parser)]
#[command(name = "crosssell-dashboard")]
#[command(about = "Dashboard for the cross-sell MLOps API", long_about = None)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value = "8501")]
    port: u16,

    /// Base URL of the prediction API
    #[arg(long, env = "BACKEND_URL", default_value = "http://backend:8000")]
    backend_url: String,

    /// Base URL of the tracking server UI
    #[arg(long, env = "MLFLOW_TRACKING_URL", default_value = "http://mlflow:5000")]
    mlflow_url: String,
}

#[derive(Clone)]
struct DashboardState {
    backend_url: String,
    mlflow_url: String,
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<String>,
}

async fn render_page(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let template = match query.page.as_deref() {
        Some("demomlops3") => DEMO_PAGE,
        _ => HOME_PAGE,
    };
    Html(
        template
            .replace("__BACKEND_URL__", &state.backend_url)
            .replace("__MLFLOW_URL__", &state.mlflow_url),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crosssell_dashboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let state = Arc::new(DashboardState {
        backend_url: cli.backend_url.trim_end_matches('/').to_string(),
        mlflow_url: cli.mlflow_url.trim_end_matches('/').to_string(),
    });

    tracing::info!(backend = %state.backend_url, tracking = %state.mlflow_url, "Dashboard configured");

    let app = Router::new().route("/", get(render_page)).with_state(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Dashboard listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
