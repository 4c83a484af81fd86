//! Route handlers
//!
//! Split the way the original surface is: node queries and input in
//! `query`, frame capture in `screen`. Everything here is a thin adapter;
//! behavior lives in `uiprobe_core`.

pub mod query;
pub mod screen;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uiprobe_core::ProbeError;
use uiprobe_protocol::ErrorBody;

/// Wire-facing error: a status code plus the `{error, message}` envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn bad_request(error: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    pub fn internal(error: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ProbeError> for ApiError {
    fn from(err: ProbeError) -> Self {
        let (status, kind) = match &err {
            ProbeError::Selector(_) => (StatusCode::BAD_REQUEST, "parse_error"),
            ProbeError::DispatchFailure(_) => (StatusCode::BAD_REQUEST, "dispatch_failure"),
            ProbeError::NoMatch(_) => (StatusCode::NOT_FOUND, "no_match"),
            ProbeError::Timeout(_) => (StatusCode::INTERNAL_SERVER_ERROR, "timeout"),
            ProbeError::EncoderUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encoder_unavailable")
            }
            ProbeError::CaptureUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "capture_unavailable")
            }
            ProbeError::Encoding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encoding_error"),
        };
        Self::new(status, kind, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Run a blocking core entry point off the async worker threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal("task_failure", e.to_string()))
}
