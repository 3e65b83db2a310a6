//! Error types for rapor-protocol

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the submission/import round-trip.
///
/// Protocol errors reject a whole paste atomically; transport errors report
/// once with no automatic retry. Per-record problems are not errors at this
/// level, they land in [`ImportOutcome::errors`](crate::ImportOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Pasted text does not contain both sentinel markers
    #[error("No submission found: sentinel markers are missing")]
    MissingMarkers,

    /// Envelope content is not valid Base64
    #[error("Invalid envelope encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Decoded envelope is not a valid payload
    #[error("Invalid payload JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Decoded bytes are not UTF-8
    #[error("Envelope is not UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Webhook endpoint unreachable or returned a transport-level failure
    #[error("Webhook delivery failed: {0}")]
    Transport(String),
}
