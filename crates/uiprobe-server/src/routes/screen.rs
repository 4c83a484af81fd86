//! Screen routes: one-shot screenshot and the change-detected multipart
//! stream.
//!
//! The stream polls the shared frame slot at the configured interval. An
//! unchanged slot produces a zero-length keep-alive unit; a changed slot
//! produces one boundary-delimited chunk. There is no natural end: the
//! generator is dropped (and the loop with it) when the client disconnects.

use super::ApiError;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;
use uiprobe_core::{Frame, ImageFormat, ProbeContext};

/// Boundary marker between stream parts.
pub const STREAM_BOUNDARY: &str = "uiprobe-screenstream";

fn parse_format(fmt: &str) -> Result<ImageFormat, ApiError> {
    fmt.parse::<ImageFormat>()
        .map_err(|e| ApiError::bad_request("bad_format", e.to_string()))
}

/// `GET /screenshot/{fmt}` — wait for a fresh frame, encode, respond.
pub async fn screenshot(
    Path(fmt): Path<String>,
    State(ctx): State<ProbeContext>,
) -> Result<Response, ApiError> {
    let format = parse_format(&fmt)?;
    let (bytes, content_type) = ctx.screenshot(format).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// One multipart chunk: boundary line, content headers, then the payload.
pub fn multipart_chunk(content_type: &str, payload: &[u8]) -> Bytes {
    let mut chunk = Vec::with_capacity(payload.len() + 128);
    chunk.extend_from_slice(format!("--{}\r\n", STREAM_BOUNDARY).as_bytes());
    chunk.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    chunk.extend_from_slice(format!("Content-Length: {}\r\n\r\n", payload.len()).as_bytes());
    chunk.extend_from_slice(payload);
    Bytes::from(chunk)
}

/// `GET /screenstream/{fmt}` — unterminated multipart stream of frames.
pub async fn screenstream(
    Path(fmt): Path<String>,
    State(ctx): State<ProbeContext>,
) -> Result<Response, ApiError> {
    let format = parse_format(&fmt)?;
    let slot = ctx.capture_stream_setup(format)?;
    let poll = ctx.config().poll_interval;
    let content_type = format.content_type();

    let stream = async_stream::stream! {
        let mut last: Option<Arc<Frame>> = None;
        loop {
            let Some(frame) = slot.changed_since(last.as_ref()) else {
                // Unchanged slot: a keep-alive unit, then one poll interval.
                yield Ok::<_, std::io::Error>(Bytes::new());
                tokio::time::sleep(poll).await;
                continue;
            };
            last = Some(frame.clone());
            match ctx.encode_frame(format, &frame) {
                Ok(payload) => yield Ok(multipart_chunk(content_type, &payload)),
                Err(err) => {
                    tracing::warn!("stream frame dropped: {}", err);
                    continue;
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", STREAM_BOUNDARY),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal("stream_error", e.to_string()))
}
