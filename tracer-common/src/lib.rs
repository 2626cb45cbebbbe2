//! # Shared Wire Constants (Payload ↔ Controller)
//!
//! Defines the names and sizes that the injected instrumentation payload and
//! the controller must agree on. The payload source is generated from these
//! constants and the stanza parser matches against them, so a rename here is
//! a protocol change on both sides.
//!
//! ## Message Shape
//!
//! ```text
//! { "type": "send",
//!   "payload": { "name": "+sync" | "+add",
//!                "from": "/process/modules" | "/interceptor/functions" | "/stalker/events",
//!                "payload": { ... } } }
//! + optional binary attachment (trace records, 16 bytes each)
//! ```
//!
//! ## Key Items
//!
//! - [`TAG_SYNC`] / [`TAG_ADD`] - Stanza tags
//! - [`SOURCE_MODULES`], [`SOURCE_FUNCTIONS`], [`SOURCE_TRACE_EVENTS`] - Source paths
//! - [`TRACE_RECORD_SIZE`] - Fixed stride of execution-trace records

#![cfg_attr(not(test), no_std)]

// ============================================================================
// Message Envelope
// ============================================================================

/// Value of the envelope `type` field for messages produced by the payload's
/// `send()` call. Every other value is an out-of-band diagnostic.
pub const MESSAGE_TYPE_SEND: &str = "send";

/// Envelope field holding the message kind
pub const FIELD_TYPE: &str = "type";

/// Envelope field holding the stanza for `send` messages
pub const FIELD_PAYLOAD: &str = "payload";

// ============================================================================
// Stanza Tags
// ============================================================================

/// **Snapshot**: the stanza payload replaces everything known for its source
pub const TAG_SYNC: &str = "+sync";

/// **Increment**: the stanza payload adds records to its source
pub const TAG_ADD: &str = "+add";

// ============================================================================
// Source Paths
// ============================================================================

/// **Module inventory**: loaded modules with their exports
///
/// Tag: `+sync`, sent once after enumeration completes
/// Payload: `{ items: [{ name, address, size, exports: [{ name, address }] }] }`
pub const SOURCE_MODULES: &str = "/process/modules";

/// **Interception points**: a read entry point returned data from the trigger port
///
/// Tag: `+add`, one per qualifying call
/// Payload: `{ items: [{ name }] }`
pub const SOURCE_FUNCTIONS: &str = "/interceptor/functions";

/// **Execution trace**: a batch of raw trace records from the followed thread
///
/// Tag: `+add`, one per drained batch
/// Payload: `{ size }` plus the records as binary attachment
pub const SOURCE_TRACE_EVENTS: &str = "/stalker/events";

// ============================================================================
// Trace Records
// ============================================================================

/// Size in bytes of one execution-trace record in a `/stalker/events` batch
///
/// The record layout itself belongs to the instrumentation runtime; only the
/// stride is part of this protocol.
pub const TRACE_RECORD_SIZE: usize = 16;

/// Number of whole trace records in an attachment of `len` bytes
///
/// Returns `None` when `len` is not a multiple of [`TRACE_RECORD_SIZE`].
#[must_use]
pub const fn trace_record_count(len: usize) -> Option<usize> {
    if len % TRACE_RECORD_SIZE == 0 {
        Some(len / TRACE_RECORD_SIZE)
    } else {
        None
    }
}

// ============================================================================
// Execution Tracer Tuning
// ============================================================================

/// Blocks executed this many times are trusted and no longer recompiled
pub const STALKER_TRUST_THRESHOLD: u32 = 2000;

/// Event queue capacity of the followed thread
pub const STALKER_QUEUE_CAPACITY: u32 = 1_000_000;

/// Interval between event queue drains, in milliseconds
pub const STALKER_QUEUE_DRAIN_INTERVAL_MS: u32 = 50;
