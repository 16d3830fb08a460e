use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// POST /api/seed (development only)
pub async fn seed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, |db| db.seed()).await?;
    info!("Seed endpoint invoked");
    Ok(Json(json!({ "message": "Seed data created successfully" })))
}
