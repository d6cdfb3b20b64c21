//! Clipboard write payloads.

use serde::Deserialize;

use crate::config::PayloadFormat;
use crate::error::RequestErrorKind;

/// JSON body accepted by `POST /`.
#[derive(Debug, Deserialize)]
struct WritePayload {
    #[serde(default)]
    data: Option<String>,
}

/// Extract the clipboard text from a write request body.
///
/// In `Auto` mode a body declared as `application/json` must be a
/// `{"data": ...}` object. Any other body is still read as one when it parses
/// as an object carrying `data`, and taken verbatim otherwise, so clients
/// that post JSON without setting a content type keep working.
///
/// Empty content is rejected in every format.
pub fn parse_payload(
    format: PayloadFormat,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<String, RequestErrorKind> {
    let text = match format {
        PayloadFormat::Json => parse_json(body)?,
        PayloadFormat::Raw => parse_raw(body)?,
        PayloadFormat::Auto if is_json(content_type) => parse_json(body)?,
        PayloadFormat::Auto => match sniff_json(body) {
            Some(text) => text,
            None => parse_raw(body)?,
        },
    };

    if text.is_empty() {
        return Err(RequestErrorKind::EmptyPayload);
    }
    Ok(text)
}

fn parse_json(body: &[u8]) -> Result<String, RequestErrorKind> {
    if body.is_empty() {
        return Err(RequestErrorKind::EmptyPayload);
    }
    let payload: WritePayload =
        serde_json::from_slice(body).map_err(|e| RequestErrorKind::InvalidJson {
            message: e.to_string(),
        })?;
    Ok(payload.data.unwrap_or_default())
}

/// `data` of a body that happens to be a `{"data": "..."}` object.
fn sniff_json(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<WritePayload>(body)
        .ok()
        .and_then(|payload| payload.data)
}

fn parse_raw(body: &[u8]) -> Result<String, RequestErrorKind> {
    String::from_utf8(body.to_vec()).map_err(|_| RequestErrorKind::InvalidUtf8)
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
