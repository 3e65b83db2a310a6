//! # rapor-protocol
//!
//! The submission round-trip: collected field values are packaged into a
//! wire-exact JSON payload, shipped over a text channel (sentinel-wrapped
//! Base64 embedded in a message) and/or a webhook channel, then decoded back
//! and merged key-by-key into the central record store.
//!
//! Partial success is a first-class outcome: an import reports
//! `success_count` alongside a per-record `errors` list and never aborts the
//! batch on a single bad record.

pub mod channel;
pub mod envelope;
pub mod error;
pub mod ingest;
pub mod payload;

pub use channel::{post_webhook, send_hybrid, wa_link};
pub use envelope::{compose_message, extract_payload, wrap_payload, SENTINEL_END, SENTINEL_START};
pub use error::{Error, Result};
pub use ingest::{import_remote_rows, import_text, merge_payload, ImportOutcome};
pub use payload::{SubmissionMeta, SubmissionPayload, SubmissionRecord};
