//! Attach coordination
//!
//! - `controller`: caller-facing state machine and observer notifications
//! - `worker`: dedicated thread that drives the engine and the aggregator
//! - `messages`: requests, completions and script messages passed between them

pub mod controller;
pub mod messages;
pub mod worker;

pub use controller::AttachController;
pub use messages::{AttachCompletion, AttachRequest, RequestId, StateChange, WorkerCommand};
pub use worker::WORKER_THREAD_NAME;
