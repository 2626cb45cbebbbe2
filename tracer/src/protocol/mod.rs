//! Stanza protocol spoken by the instrumentation payload
//!
//! - `message`: classify raw engine messages into stanzas or diagnostics
//! - `stanza`: tagged stanza variants keyed by `(tag, source)`
//! - `records`: module, export, interception and trace-batch records

pub mod message;
pub mod records;
pub mod stanza;

pub use message::{classify, Inbound};
pub use records::{ExportRecord, InterceptedFunction, ModuleRecord, TraceEventBatch};
pub use stanza::{parse_stanza, AddStanza, Stanza, SyncStanza};
