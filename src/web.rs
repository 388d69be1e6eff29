use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue, http::Method, http::header, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::config::ServerConfig;

const BANNER: &str = "Barrier-free travel planning backend is running.";
const MAX_BODY_BYTES: usize = 64 * 1024;

async fn banner() -> &'static str {
    BANNER
}

/// Full application router: health banner plus the `/api` routes
pub fn app(state: AppState, config: &ServerConfig) -> Result<Router> {
    let origin = HeaderValue::from_str(&config.frontend_origin)
        .with_context(|| format!("Invalid frontend origin '{}'", config.frontend_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/", get(banner))
        .nest("/api", api::router(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = app(state, config)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", config.port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
