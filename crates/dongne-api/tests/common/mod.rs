#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use dongne_api::{AppState, AppStateInner, Config, auth, router};
use dongne_db::Database;

pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub state: AppState,
    pub app: Router,
    _dir: tempfile::TempDir,
}

pub fn config(issuer: Option<&str>) -> Config {
    Config::from_lookup(|key| match key {
        "DONGNE_SESSION_SECRET" => Some(SECRET.into()),
        "DONGNE_ENV" => Some("development".into()),
        "OIDC_ISSUER_URL" => issuer.map(str::to_string),
        "OIDC_CLIENT_ID" => Some("dongne-test".into()),
        "OIDC_CLIENT_SECRET" => Some("provider-secret".into()),
        _ => None,
    })
    .unwrap()
}

/// Seeded database behind a fresh router.
pub fn spawn_app(issuer: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("api.db")).unwrap();
    db.seed().unwrap();
    let state = AppStateInner::new(db, config(issuer));
    TestApp {
        app: router(state.clone()),
        state,
        _dir: dir,
    }
}

pub fn bearer(user_id: &str) -> String {
    let (token, _) = auth::create_token(SECRET, user_id, chrono::Duration::hours(1)).unwrap();
    format!("Bearer {token}")
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (u16, Value) {
        let mut req = Request::get(uri);
        if let Some(user) = user {
            req = req.header(header::AUTHORIZATION, bearer(user));
        }
        let resp = self.send(req.body(Body::empty()).unwrap()).await;
        split(resp).await
    }

    pub async fn post_json(&self, uri: &str, user: Option<&str>, body: Value) -> (u16, Value) {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            req = req.header(header::AUTHORIZATION, bearer(user));
        }
        let resp = self.send(req.body(Body::from(body.to_string())).unwrap()).await;
        split(resp).await
    }
}

pub async fn split(resp: Response<Body>) -> (u16, Value) {
    let status = resp.status().as_u16();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
