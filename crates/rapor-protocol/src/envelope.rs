//! Text-channel envelope
//!
//! The payload travels as `RAPOR_V2_START` + Base64(UTF-8(JSON)) +
//! `RAPOR_V2_END` embedded verbatim in free text, so it survives copy/paste
//! through messaging apps.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::payload::SubmissionPayload;

/// Literal start marker of the text-channel envelope
pub const SENTINEL_START: &str = "RAPOR_V2_START";

/// Literal end marker of the text-channel envelope
pub const SENTINEL_END: &str = "RAPOR_V2_END";

/// Encode a payload into its sentinel-wrapped envelope
pub fn wrap_payload(payload: &SubmissionPayload) -> Result<String> {
    let json = serde_json::to_string(payload)?;
    Ok(format!(
        "{}{}{}",
        SENTINEL_START,
        STANDARD.encode(json.as_bytes()),
        SENTINEL_END
    ))
}

/// Extract and decode the payload embedded anywhere in pasted text.
///
/// Missing markers, invalid Base64 and invalid JSON all reject the whole
/// paste atomically.
pub fn extract_payload(text: &str) -> Result<SubmissionPayload> {
    let start = text.find(SENTINEL_START).ok_or(Error::MissingMarkers)?;
    let rest = &text[start + SENTINEL_START.len()..];
    let end = rest.find(SENTINEL_END).ok_or(Error::MissingMarkers)?;

    let encoded = rest[..end].trim();
    let bytes = STANDARD.decode(encoded)?;
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&json)?)
}

/// Compose the human-readable message carrying an envelope.
///
/// `delivered` annotates a hybrid submission whose payload already went out
/// over the webhook; the text copy then serves as a verifiable backup.
pub fn compose_message(payload: &SubmissionPayload, delivered: bool) -> Result<String> {
    let note = if delivered { " (sudah terkirim via webhook)" } else { "" };
    Ok(format!(
        "Data Rapor {} {} Semester {}{}\n\n{}",
        payload.meta.rombel_name,
        payload.meta.tahun_ajaran,
        payload.meta.semester,
        note,
        wrap_payload(payload)?
    ))
}
