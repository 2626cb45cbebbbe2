//! Messages exchanged between the controller, the worker and script callbacks

use crate::domain::{AttachFailure, ControllerState, TargetProcess};
use crate::engine::RawMessage;
use crate::payload::PayloadConfig;

/// Identifies one attach request; increases monotonically per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Everything the worker needs to perform one attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    pub id: RequestId,
    pub target: TargetProcess,
    pub config: PayloadConfig,
}

/// Controller → worker
#[derive(Debug)]
pub enum WorkerCommand {
    Attach(AttachRequest),
}

/// Worker → controller, exactly one per [`AttachRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachCompletion {
    pub request_id: RequestId,
    pub result: Result<(), AttachFailure>,
}

/// Script callback → worker
///
/// `generation` identifies the script that produced the message so output
/// from a discarded script never reaches the aggregator.
#[derive(Debug)]
pub struct ScriptMessage {
    pub generation: u64,
    pub raw: RawMessage,
}

/// Published to observers on every actual state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub previous: ControllerState,
    pub current: ControllerState,
    /// Set when the transition is the result of a failed attach
    pub failure: Option<AttachFailure>,
}
