//! Registry REST API

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::registry::{self, Registration};
use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Register a network platform and publish its entity graph
pub async fn register_platform(
    State(state): State<Arc<AppState>>,
    Json(registration): Json<Registration>,
) -> impl IntoResponse {
    info!(platform = %registration.platform_id, "Platform registration requested");

    let batch_size = state.config.sync.batch_size;
    match registry::register_platform(&state.broker, &registration, batch_size).await {
        Ok(summary) => (StatusCode::CREATED, Json(summary)).into_response(),
        Err(e) => {
            error!(platform = %registration.platform_id, error = %e, "Registration failed");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiError::new(format!("Registration failed: {}", e))),
            )
                .into_response()
        }
    }
}

/// Run the registry API server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = Router::new()
        .route("/platforms", post(register_platform))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, "Starting registry API server");
    axum::serve(listener, app).await?;
    Ok(())
}
