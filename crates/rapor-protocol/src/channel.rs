//! Delivery channels
//!
//! Two ways out: a messaging deep link carrying the envelope in pre-filled
//! text, and a fire-and-forget webhook POST. Hybrid mode runs the webhook
//! first and then hands back the annotated text message as a backup.

use log::{debug, warn};

use crate::envelope::compose_message;
use crate::error::{Error, Result};
use crate::payload::SubmissionPayload;

/// Build a messaging deep link opening a pre-filled message.
///
/// Without a destination number the link opens a contact picker instead.
pub fn wa_link(number: Option<&str>, message: &str) -> String {
    match number {
        Some(n) => format!("https://wa.me/{}?text={}", n, percent_encode(message)),
        None => format!("https://wa.me/?text={}", percent_encode(message)),
    }
}

/// POST the payload to a user-supplied endpoint, fire-and-forget.
///
/// The response body is not parsed; any failure surfaces as a single
/// transport error with no automatic retry.
pub fn post_webhook(url: &str, payload: &SubmissionPayload) -> Result<()> {
    debug!("posting submission to {}", url);
    ureq::post(url)
        .send_json(payload)
        .map_err(|e| {
            warn!("webhook delivery to {} failed: {}", url, e);
            Error::Transport(e.to_string())
        })?;
    Ok(())
}

/// Hybrid delivery: webhook first, then the text channel carries the same
/// payload annotated as already delivered. Returns the deep link to open.
pub fn send_hybrid(
    url: &str,
    number: Option<&str>,
    payload: &SubmissionPayload,
) -> Result<String> {
    post_webhook(url, payload)?;
    let message = compose_message(payload, true)?;
    Ok(wa_link(number, &message))
}

/// Minimal percent-encoding for the deep link query value. Unreserved
/// characters pass through, everything else is encoded byte-wise.
fn percent_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{:02X}", byte));
            }
        }
    }
    out
}
