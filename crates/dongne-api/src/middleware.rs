use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::debug;

use dongne_types::models::UserId;

use crate::auth::{SESSION_COOKIE, decode_token, session_key};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// The authenticated caller, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
}

/// Accept a bearer JWT or a live session cookie, else 401.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = resolve_user(&state, req.headers(), &jar)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(CurrentUser { id: user_id });
    Ok(next.run(req).await)
}

/// Like `require_auth`, but anonymous requests pass through without a `CurrentUser`.
pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, req.headers(), &jar).await {
        Ok(Some(user_id)) => {
            req.extensions_mut().insert(CurrentUser { id: user_id });
        }
        Ok(None) => {}
        Err(e) => debug!("Ignoring credentials on optional route: {}", e),
    }
    next.run(req).await
}

async fn resolve_user(
    state: &AppState,
    headers: &HeaderMap,
    jar: &CookieJar,
) -> Result<Option<UserId>, ApiError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        let claims = decode_token(&state.config.session_secret, token)
            .map_err(|_| ApiError::Unauthorized)?;
        return Ok(Some(claims.sub));
    }

    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let key = session_key(cookie.value());
    blocking(state, move |db| db.get_session_user(&key, chrono::Utc::now())).await
}
