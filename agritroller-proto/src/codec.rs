//! Text codec for event stream frames.
//!
//! Each frame is a single JSON object. Decoding never panics: anything that
//! is not a well-formed envelope comes back as a [`CodecError`] so the
//! stream can drop the one message and carry on.

use crate::envelope::EventEnvelope;

/// Error type for envelope encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is not valid JSON or does not have the envelope shape.
    #[error("malformed event envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A binary frame did not contain UTF-8 text.
    #[error("event frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Decodes an [`EventEnvelope`] from a text frame.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for invalid JSON, a non-object
/// document, a missing `type` tag, or a field of the wrong type. A
/// malformed `notification` hint is not an error; it decodes as `None`.
pub fn decode(raw: &str) -> Result<EventEnvelope, CodecError> {
    Ok(serde_json::from_str(raw)?)
}

/// Decodes an [`EventEnvelope`] from a binary frame holding UTF-8 JSON.
///
/// # Errors
///
/// Returns [`CodecError::Utf8`] if the bytes are not UTF-8, otherwise the
/// same errors as [`decode`].
pub fn decode_bytes(raw: &[u8]) -> Result<EventEnvelope, CodecError> {
    decode(std::str::from_utf8(raw)?)
}

/// Encodes an [`EventEnvelope`] as a compact JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the payload cannot be serialized.
pub fn encode(envelope: &EventEnvelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}
