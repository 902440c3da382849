//! The HTTP service: routing, CORS and shared state.

mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use macula_core::{Config, StageClassifier, StagePipeline};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// State shared by all request handlers.
pub struct AppState {
    pub config: Config,
    pub pipeline: StagePipeline,
}

/// Run the classification service until the process is stopped.
pub async fn run(config: Config, classifier: Option<Arc<StageClassifier>>) -> anyhow::Result<()> {
    let pipeline = StagePipeline::new(&config, classifier);
    let body_limit = config.limits.max_file_size_mb as usize * 1024 * 1024;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState { config, pipeline });

    // The frontend is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/model-info", get(handlers::model_info_handler))
        .route("/api/predict", post(handlers::predict_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state.clone());

    tracing::info!(
        "Macula v{} listening on http://{} (model loaded: {})",
        macula_core::VERSION,
        addr,
        state.pipeline.model_loaded()
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
