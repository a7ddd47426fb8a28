use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Uploaded payload is not valid base64 or not a decodable image
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unreadable image bytes: {0}")]
    Image(#[from] image::ImageError),
}

/// A candidate's remote image could not be retrieved or decoded
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unreadable image bytes: {0}")]
    Image(#[from] image::ImageError),
}

/// Request-level error taxonomy
///
/// Any variant aborts the whole match request: the first bad candidate fails
/// the batch, no partial results are returned.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("decoding uploaded image: {0}")]
    Decode(#[from] DecodeError),

    #[error("fetching candidate image {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("encoding image: {0}")]
    Embed(#[from] anyhow::Error),
}

impl ServiceError {
    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Decode(_) => "DECODE_ERROR",
            ServiceError::Fetch { .. } => "FETCH_ERROR",
            ServiceError::Embed(_) => "EMBED_ERROR",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        // Decode and fetch failures are deliberately not distinguished by
        // status: the caller sees a generic server error either way.
        log::error!("match request failed: {self}");

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
