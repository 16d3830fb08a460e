//! Login through the external identity provider, server-side sessions and
//! bearer tokens for non-browser clients.

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use dongne_types::api::{Claims, TokenResponse, UpsertUser};

use crate::config::OidcConfig;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

pub const SESSION_COOKIE: &str = "sid";
pub const STATE_COOKIE: &str = "oauth_state";

/// Seconds the provider round-trip may take before the state cookie lapses.
const STATE_COOKIE_MAX_AGE: i64 = 10 * 60;

/// Storage key for a session id. Only the hash is persisted.
pub fn session_key(sid: &str) -> String {
    hex::encode(Sha256::digest(sid.as_bytes()))
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn create_token(
    secret: &str,
    user_id: &str,
    ttl: chrono::Duration,
) -> jsonwebtoken::errors::Result<(String, DateTime<Utc>)> {
    let expires_at = Utc::now() + ttl;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expires_at.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, expires_at))
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// 302 with a `Location` header.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn cookie(name: &'static str, value: String, path: &'static str, max_age_secs: i64) -> Cookie<'static> {
    // Parsing keeps Max-Age in plain seconds
    let mut cookie = Cookie::parse(format!("{name}={value}; Max-Age={max_age_secs}"))
        .unwrap_or_else(|_| Cookie::new(name, value));
    cookie.set_path(path);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

fn oidc(state: &AppState) -> Result<&OidcConfig, ApiError> {
    state
        .config
        .oidc
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Login provider is not configured".into()))
}

/// GET /api/login
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let oidc = oidc(&state)?;
    let csrf = random_token();

    let url = reqwest::Url::parse_with_params(
        &format!("{}/authorize", oidc.issuer_url),
        &[
            ("response_type", "code"),
            ("client_id", oidc.client_id.as_str()),
            ("redirect_uri", oidc.redirect_url.as_str()),
            ("scope", "openid email profile"),
            ("state", csrf.as_str()),
        ],
    )
    .map_err(|e| ApiError::Internal(format!("Bad issuer URL: {e}")))?;

    let jar = jar.add(cookie(STATE_COOKIE, csrf, "/api", STATE_COOKIE_MAX_AGE));
    Ok((jar, found(url.as_str())).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    sub: String,
    email: Option<String>,
    #[serde(alias = "given_name")]
    first_name: Option<String>,
    #[serde(alias = "family_name")]
    last_name: Option<String>,
    #[serde(alias = "picture")]
    profile_image_url: Option<String>,
}

/// GET /api/callback
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> Result<Response, ApiError> {
    let oidc = oidc(&state)?;

    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || query.state != expected {
        warn!("Login callback with missing or mismatched state");
        return Err(ApiError::BadRequest("Invalid login state".into()));
    }
    let code = query
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".into()))?;

    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", oidc.redirect_url.as_str()),
        ("client_id", oidc.client_id.as_str()),
    ];
    if let Some(secret) = &oidc.client_secret {
        form.push(("client_secret", secret.as_str()));
    }

    let token = state
        .http
        .post(format!("{}/token", oidc.issuer_url))
        .form(&form)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| provider_error("token exchange", e))?
        .json::<ProviderToken>()
        .await
        .map_err(|e| provider_error("token response", e))?;

    let profile = state
        .http
        .get(format!("{}/userinfo", oidc.issuer_url))
        .bearer_auth(&token.access_token)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| provider_error("userinfo", e))?
        .json::<ProviderUser>()
        .await
        .map_err(|e| provider_error("userinfo response", e))?;

    let upsert = UpsertUser {
        id: profile.sub,
        email: profile.email,
        first_name: profile.first_name,
        last_name: profile.last_name,
        profile_image_url: profile.profile_image_url,
    };
    let sid = random_token();
    let key = session_key(&sid);
    let ttl = state.config.session_ttl();
    let region = state.config.default_region.clone();

    let user = blocking(&state, move |db| {
        let user = db.upsert_user(&upsert, &region)?;
        db.create_session(&key, &user.id, Utc::now() + ttl)?;
        Ok(user)
    })
    .await?;

    info!("User {} logged in", user.id);

    let jar = jar
        .remove(Cookie::build(STATE_COOKIE).path("/api"))
        .add(cookie(SESSION_COOKIE, sid, "/", ttl.num_seconds()));
    Ok((jar, found("/")).into_response())
}

fn provider_error(stage: &str, err: reqwest::Error) -> ApiError {
    warn!("Identity provider {} failed: {}", stage, err);
    ApiError::BadGateway("Login provider request failed".into())
}

/// GET /api/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    if let Some(sid) = jar.get(SESSION_COOKIE) {
        let key = session_key(sid.value());
        blocking(&state, move |db| db.delete_session(&key)).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));

    let Some(oidc) = state.config.oidc.as_ref() else {
        return Ok((jar, found("/")).into_response());
    };

    let post_logout = reqwest::Url::parse(&oidc.redirect_url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_else(|_| "/".to_string());
    let url = reqwest::Url::parse_with_params(
        &format!("{}/session/end", oidc.issuer_url),
        &[
            ("client_id", oidc.client_id.as_str()),
            ("post_logout_redirect_uri", post_logout.as_str()),
        ],
    )
    .map_err(|e| ApiError::Internal(format!("Bad issuer URL: {e}")))?;

    Ok((jar, found(url.as_str())).into_response())
}

/// GET /api/auth/user
pub async fn current_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let record = blocking(&state, move |db| db.get_user(&user.id)).await?;
    record
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

/// POST /api/auth/token
pub async fn issue_token(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let (token, expires_at) =
        create_token(&state.config.session_secret, &user.id, state.config.session_ttl())
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))?;
    Ok(Json(TokenResponse { token, expires_at }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_and_wrong_secret() {
        let (token, expires_at) =
            create_token("secret-a", "user1", chrono::Duration::hours(1)).unwrap();
        let claims = decode_token("secret-a", &token).unwrap();
        assert_eq!(claims.sub, "user1");
        assert_eq!(claims.exp, expires_at.timestamp() as usize);
        assert!(decode_token("secret-b", &token).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let (token, _) = create_token("secret-a", "user1", chrono::Duration::hours(-2)).unwrap();
        assert!(decode_token("secret-a", &token).is_err());
    }

    #[test]
    fn session_keys_are_stable_hashes() {
        let sid = random_token();
        assert_eq!(session_key(&sid), session_key(&sid));
        assert_eq!(session_key(&sid).len(), 64);
        assert_ne!(session_key(&sid), sid);
        assert_ne!(random_token(), sid);
    }

    #[test]
    fn cookies_carry_max_age() {
        let c = cookie(SESSION_COOKIE, "abc".into(), "/", 3600);
        let rendered = c.to_string();
        assert!(rendered.contains("Max-Age=3600"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
    }
}
