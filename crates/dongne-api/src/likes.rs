use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};

use dongne_types::models::ItemId;

use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

/// GET /api/likes
pub async fn list_likes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let items = blocking(&state, move |db| db.list_liked_items(&user.id)).await?;
    Ok(Json(items))
}

/// POST /api/likes/{item_id}
pub async fn toggle_like(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<ItemId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let result = blocking(&state, move |db| db.toggle_like(&user.id, item_id)).await?;
    Ok(Json(result))
}
