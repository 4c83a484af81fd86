//! Error types for the probe core
//!
//! One taxonomy covers every core operation; the HTTP surface maps these
//! onto status codes and the wire error envelope.

use crate::encode::ImageFormat;
use crate::selector::ParseError;
use thiserror::Error;

/// Errors that can occur inside the query-and-control engine.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Malformed selector text.
    #[error("selector parse error: {0}")]
    Selector(#[from] ParseError),

    /// A selector that was required to match at least one node matched none.
    #[error("no node matches selector `{0}`")]
    NoMatch(String),

    /// No registered encoder can produce the requested output format.
    #[error("no encoder available for `{0}`")]
    EncoderUnavailable(ImageFormat),

    /// Frame capture cannot proceed (no window, hook not installable, ...).
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(&'static str),

    /// Encoding a captured frame failed.
    #[error("image encoding failed: {0}")]
    Encoding(#[from] image::ImageError),

    /// A synthetic input gesture could not be composed or delivered.
    /// Nothing was dispatched.
    #[error("input dispatch failed: {0}")]
    DispatchFailure(String),

    /// A bounded wait elapsed before the awaited event arrived.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

impl ProbeError {
    /// Create a DispatchFailure from any displayable cause.
    pub fn dispatch(cause: impl std::fmt::Display) -> Self {
        Self::DispatchFailure(cause.to_string())
    }
}
