use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use dongne_types::api::{FieldError, NewCategory};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, blocking};

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = blocking(&state, |db| db.list_categories()).await?;
    Ok(Json(categories))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewCategory {
        name: req.name.trim().to_string(),
        slug: req.slug.trim().to_lowercase(),
    };

    let mut errors = Vec::new();
    if new.name.is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if new.slug.is_empty() {
        errors.push(FieldError::new("slug", "Slug is required"));
    } else if !new.slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        errors.push(FieldError::new("slug", "Slug may only contain letters, digits, '-' and '_'"));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation("Invalid category data", errors));
    }

    let category = blocking(&state, move |db| db.create_category(&new)).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
