//! # tracer - Trigger-Port Execution Tracing
//!
//! tracer attaches an instrumentation engine to a running process, injects a
//! payload that watches socket reads, and starts an execution trace on the
//! first thread that reads data from a chosen peer port. Everything the
//! payload learns comes back as a stream of stanzas that is summarized on the
//! host side.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Target Process                           │
//! │  payload: module snapshot, read interception, thread following  │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ +sync / +add stanzas (engine messages)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     tracer-worker thread                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    Engine    │──▶│   Protocol   │──▶│  Aggregator  │──▶ sink │
//! │  │ attach/load  │   │  (stanzas)   │   │  (summary)   │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ completions          ▲ attach requests
//!                         ▼                      │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 AttachController (caller thread)                │
//! │           Detached ──▶ Attaching ──▶ Attached / Detached        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`attach`]: controller state machine and the worker thread behind it
//! - [`engine`]: traits an instrumentation engine implements
//! - [`payload`]: renders the injected agent for a trigger port
//! - [`protocol`]: classifies engine messages and parses stanzas
//! - [`aggregator`]: module table, interceptions and trace counters
//! - [`domain`]: core types and error enums
//! - [`cli`]: command-line arguments of the `tracer` binary
//!
//! ## Typical Usage
//!
//! ```bash
//! # Render the payload for an out-of-process engine
//! ./tracer --trigger-port 4444 --output agent.js
//! ```
//!
//! ## Key Concepts
//!
//! - **Stanza**: one `{name, from, payload}` message; `+sync` replaces, `+add` appends
//! - **Trigger port**: peer port whose first read starts the trace
//! - **Trace record**: fixed 16-byte execution event from the followed thread

pub mod aggregator;
pub mod attach;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod payload;
pub mod protocol;
