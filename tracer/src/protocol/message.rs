//! Classification of raw engine messages
//!
//! The engine wraps everything the payload produces in an envelope with a
//! `type` field. Only `send` envelopes carry stanzas; logs, errors and any
//! other envelope kinds are passed through untouched for diagnostics.

use serde_json::Value;
use tracer_common::{FIELD_PAYLOAD, FIELD_TYPE, MESSAGE_TYPE_SEND};

use super::stanza::{parse_stanza, Stanza};
use crate::domain::StanzaError;
use crate::engine::RawMessage;

/// A raw message after classification
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Protocol stanza from the payload's `send()`
    Stanza(Stanza),
    /// Anything else the engine delivered (log lines, script errors, ...)
    Unclassified(Value),
}

/// Classify a raw message
///
/// # Errors
/// Returns a [`StanzaError`] when a `send` envelope does not contain a
/// well-formed stanza. Non-`send` envelopes never fail.
pub fn classify(raw: RawMessage) -> Result<Inbound, StanzaError> {
    let RawMessage { mut message, data } = raw;

    let is_send = message.get(FIELD_TYPE).and_then(Value::as_str) == Some(MESSAGE_TYPE_SEND);
    if !is_send {
        return Ok(Inbound::Unclassified(message));
    }

    let stanza = message
        .as_object_mut()
        .and_then(|envelope| envelope.remove(FIELD_PAYLOAD))
        .ok_or(StanzaError::MissingField(FIELD_PAYLOAD))?;

    parse_stanza(stanza, data).map(Inbound::Stanza)
}
