//! # Stanzas
//!
//! A stanza is `{name, from, payload}` plus an optional binary attachment.
//! `name` is the tag (`+sync` / `+add`), `from` the source path. The payload
//! shape is fixed per known `(tag, source)` pair; everything else is kept as
//! an `Unknown` variant so newer payloads do not break older controllers.
//!
//! | Tag     | Source                   | Variant                              |
//! |---------|--------------------------|--------------------------------------|
//! | `+sync` | `/process/modules`       | [`SyncStanza::Modules`]              |
//! | `+add`  | `/interceptor/functions` | [`AddStanza::InterceptedFunctions`]  |
//! | `+add`  | `/stalker/events`        | [`AddStanza::TraceEvents`]           |
//! | `+sync` | *(other)*                | [`SyncStanza::Unknown`]              |
//! | `+add`  | *(other)*                | [`AddStanza::Unknown`]               |
//! | *(other)* | *(any)*                | [`Stanza::Unknown`]                  |

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracer_common::{SOURCE_FUNCTIONS, SOURCE_MODULES, SOURCE_TRACE_EVENTS, TAG_ADD, TAG_SYNC};

use super::records::{InterceptedFunction, ModuleRecord, TraceEventBatch};
use crate::domain::StanzaError;

/// A classified stanza
#[derive(Debug, Clone, PartialEq)]
pub enum Stanza {
    Sync(SyncStanza),
    Add(AddStanza),
    /// Tag this controller does not know
    Unknown { tag: String, source: String, payload: Value },
}

/// Full-replacement snapshot for a source
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStanza {
    Modules(Vec<ModuleRecord>),
    Unknown { source: String, payload: Value },
}

/// Incremental addition to a source
#[derive(Debug, Clone, PartialEq)]
pub enum AddStanza {
    InterceptedFunctions(Vec<InterceptedFunction>),
    TraceEvents(TraceEventBatch),
    Unknown { source: String, payload: Value, attachment: Option<Vec<u8>> },
}

impl Stanza {
    /// Wire tag (`+sync`, `+add`, or whatever unknown tag was received)
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Stanza::Sync(_) => TAG_SYNC,
            Stanza::Add(_) => TAG_ADD,
            Stanza::Unknown { tag, .. } => tag,
        }
    }

    /// Source path the stanza is addressed to
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Stanza::Sync(SyncStanza::Modules(_)) => SOURCE_MODULES,
            Stanza::Add(AddStanza::InterceptedFunctions(_)) => SOURCE_FUNCTIONS,
            Stanza::Add(AddStanza::TraceEvents(_)) => SOURCE_TRACE_EVENTS,
            Stanza::Sync(SyncStanza::Unknown { source, .. })
            | Stanza::Add(AddStanza::Unknown { source, .. })
            | Stanza::Unknown { source, .. } => source,
        }
    }
}

/// `{ items: [...] }` wrapper used by the list-carrying payloads
#[derive(Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

/// Parse the `payload` field of a `send` message into a [`Stanza`]
///
/// # Errors
/// - [`StanzaError::NotAnObject`] - the stanza is not a JSON object
/// - [`StanzaError::MissingField`] - `name` or `from` absent or not a string
/// - [`StanzaError::InvalidPayload`] - known source with a payload of the wrong shape
/// - [`StanzaError::MissingAttachment`] - trace batch without binary data
pub fn parse_stanza(stanza: Value, attachment: Option<Vec<u8>>) -> Result<Stanza, StanzaError> {
    let Value::Object(mut fields) = stanza else {
        return Err(StanzaError::NotAnObject);
    };

    let tag = take_string(&mut fields, "name")?;
    let source = take_string(&mut fields, "from")?;
    let payload = fields.remove("payload").unwrap_or(Value::Null);

    if tag == TAG_SYNC {
        let sync = if source == SOURCE_MODULES {
            SyncStanza::Modules(parse_items(&source, payload)?)
        } else {
            SyncStanza::Unknown { source, payload }
        };
        return Ok(Stanza::Sync(sync));
    }

    if tag == TAG_ADD {
        let add = if source == SOURCE_FUNCTIONS {
            AddStanza::InterceptedFunctions(parse_items(&source, payload)?)
        } else if source == SOURCE_TRACE_EVENTS {
            let data = attachment.ok_or(StanzaError::MissingAttachment)?;
            let declared_size = payload.get("size").and_then(Value::as_u64);
            AddStanza::TraceEvents(TraceEventBatch { data, declared_size })
        } else {
            AddStanza::Unknown { source, payload, attachment }
        };
        return Ok(Stanza::Add(add));
    }

    Ok(Stanza::Unknown { tag, source, payload })
}

fn take_string(
    fields: &mut serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<String, StanzaError> {
    match fields.remove(key) {
        Some(Value::String(value)) => Ok(value),
        _ => Err(StanzaError::MissingField(key)),
    }
}

fn parse_items<T: DeserializeOwned>(source: &str, payload: Value) -> Result<Vec<T>, StanzaError> {
    serde_json::from_value::<Items<T>>(payload)
        .map(|wrapper| wrapper.items)
        .map_err(|e| StanzaError::InvalidPayload {
            source_path: source.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use serde_json::json;

    #[test]
    fn test_parse_modules_sync() {
        let stanza = json!({
            "name": "+sync",
            "from": "/process/modules",
            "payload": { "items": [
                { "name": "a.out", "address": "0x400000", "size": 8192, "exports": [] },
                { "name": "libc.so.6", "address": "0x7f0000000000", "size": 4096,
                  "exports": [{ "name": "recv", "address": "0x7f0000000010" }] }
            ]}
        });

        let Stanza::Sync(SyncStanza::Modules(modules)) = parse_stanza(stanza, None).unwrap() else {
            panic!("expected module snapshot");
        };
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].base_address, Address(0x40_0000));
        assert_eq!(modules[1].exports[0].address, Address(0x7f00_0000_0010));
    }

    #[test]
    fn test_parse_intercepted_functions() {
        let stanza = json!({
            "name": "+add",
            "from": "/interceptor/functions",
            "payload": { "items": [{ "name": "recv" }] }
        });

        let parsed = parse_stanza(stanza, None).unwrap();
        assert_eq!(parsed.tag(), "+add");
        assert_eq!(parsed.source(), "/interceptor/functions");
        assert_eq!(
            parsed,
            Stanza::Add(AddStanza::InterceptedFunctions(vec![InterceptedFunction {
                name: "recv".to_string()
            }]))
        );
    }

    #[test]
    fn test_parse_trace_events_keeps_attachment() {
        let stanza = json!({
            "name": "+add",
            "from": "/stalker/events",
            "payload": { "size": 32 }
        });

        let parsed = parse_stanza(stanza, Some(vec![7u8; 32])).unwrap();
        let Stanza::Add(AddStanza::TraceEvents(batch)) = parsed else {
            panic!("expected trace batch");
        };
        assert_eq!(batch.data.len(), 32);
        assert_eq!(batch.declared_size, Some(32));
    }

    #[test]
    fn test_trace_events_without_attachment_rejected() {
        let stanza = json!({ "name": "+add", "from": "/stalker/events", "payload": { "size": 0 } });
        assert_eq!(parse_stanza(stanza, None), Err(StanzaError::MissingAttachment));
    }

    #[test]
    fn test_unknown_source_and_tag_are_preserved() {
        let sync = parse_stanza(json!({ "name": "+sync", "from": "/threads", "payload": {} }), None)
            .unwrap();
        assert!(matches!(sync, Stanza::Sync(SyncStanza::Unknown { ref source, .. }) if source == "/threads"));

        let other =
            parse_stanza(json!({ "name": "+remove", "from": "/process/modules" }), None).unwrap();
        assert_eq!(other.tag(), "+remove");
        assert_eq!(other.source(), "/process/modules");
    }

    #[test]
    fn test_malformed_stanzas() {
        assert_eq!(parse_stanza(json!("hello"), None), Err(StanzaError::NotAnObject));
        assert_eq!(
            parse_stanza(json!({ "from": "/process/modules" }), None),
            Err(StanzaError::MissingField("name"))
        );
        assert_eq!(
            parse_stanza(json!({ "name": "+add", "from": 3 }), None),
            Err(StanzaError::MissingField("from"))
        );

        let bad_items = json!({
            "name": "+sync",
            "from": "/process/modules",
            "payload": { "items": [{ "name": "x" }] }
        });
        assert!(matches!(
            parse_stanza(bad_items, None),
            Err(StanzaError::InvalidPayload { ref source_path, .. }) if source_path == "/process/modules"
        ));
    }
}
