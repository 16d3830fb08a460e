use axum::{
    Json,
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use dongne_db::DbError;
use dongne_types::api::FieldError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let errors = match &self {
            Self::Validation { errors, .. } => Some(errors.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            message: &message,
            errors,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Storage failures: typed conflicts and misses keep their meaning, the rest
/// are logged here and hidden behind a generic 500.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DbError>() {
            Some(DbError::Conflict(msg)) => Self::Conflict(msg.clone()),
            Some(db_err @ DbError::NotFound(_)) => Self::NotFound(db_err.to_string()),
            None => {
                error!("Storage error: {:#}", err);
                Self::Internal("Internal server error".into())
            }
        }
    }
}

/// Extractor rejections keep axum's explanation but use the JSON body shape.
macro_rules! bad_request_from {
    ($($rejection:ty),+) => {$(
        impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                debug!("Rejected request: {}", rejection.body_text());
                Self::BadRequest(rejection.body_text())
            }
        }
    )+};
}

bad_request_from!(JsonRejection, PathRejection, QueryRejection, MultipartRejection);

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn plain_errors_render_message_only() {
        let (status, body) = render(ApiError::NotFound("Item not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "message": "Item not found" }));
    }

    #[tokio::test]
    async fn validation_lists_fields() {
        let (status, body) = render(ApiError::validation(
            "Invalid item data",
            vec![FieldError::new("title", "Title is required")],
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid item data");
        assert_eq!(body["errors"][0]["field"], "title");
    }

    #[tokio::test]
    async fn db_errors_keep_their_meaning() {
        let conflict: ApiError = anyhow::Error::from(DbError::Conflict("category slug already exists".into())).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing: ApiError = anyhow::Error::from(DbError::NotFound("Item")).into();
        let (status, body) = render(missing).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Item not found");

        let other: ApiError = anyhow::anyhow!("disk on fire").into();
        let (status, body) = render(other).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
