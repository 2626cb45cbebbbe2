//! Structured error types for tracer
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::ControllerState;
use std::fmt;
use thiserror::Error;

/// Rejections reported synchronously by the attach controller
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Invalid state: attach requires detached, controller is {current}")]
    InvalidState { current: ControllerState },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to start attach worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Attach worker is no longer running")]
    WorkerUnavailable,

    #[error("Attach worker panicked")]
    WorkerPanicked,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid trigger port {0}: must be between 1 and 65535")]
    InvalidTriggerPort(u16),
}

/// Step of the attach sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStage {
    /// Worker refused the request (a session is already live)
    Precondition,
    /// `attach(pid)` on the engine
    Attach,
    /// `create_script(source)` on the session
    CreateScript,
    /// Registering the message callback on the script
    Subscribe,
    /// `load()` on the script
    Load,
}

impl fmt::Display for AttachStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttachStage::Precondition => "precondition",
            AttachStage::Attach => "attach",
            AttachStage::CreateScript => "create script",
            AttachStage::Subscribe => "subscribe",
            AttachStage::Load => "load",
        };
        f.write_str(name)
    }
}

/// Failure of the attach → compile → load sequence
///
/// Carried back to the controller inside the completion message. Only the
/// primary failure is recorded; errors from releasing a half-built session
/// are never reported here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Attach failed during {stage}: {message}")]
pub struct AttachFailure {
    pub stage: AttachStage,
    pub message: String,
}

impl AttachFailure {
    #[must_use]
    pub fn new(stage: AttachStage, message: impl Into<String>) -> Self {
        Self { stage, message: message.into() }
    }
}

/// Error reported by the instrumentation engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A message from the payload that could not be turned into a stanza,
/// or a stanza whose contents are unusable
///
/// Never fatal: logged and counted by the worker and aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StanzaError {
    #[error("Stanza is not a JSON object")]
    NotAnObject,

    #[error("Stanza is missing field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid {source_path} payload: {reason}")]
    InvalidPayload { source_path: String, reason: String },

    #[error("Trace batch of {len} bytes is not a multiple of {stride}")]
    MisalignedBatch { len: usize, stride: usize },

    #[error("Trace batch has no binary attachment")]
    MissingAttachment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_display() {
        let err = ControllerError::InvalidState { current: ControllerState::Attaching };
        assert_eq!(
            err.to_string(),
            "Invalid state: attach requires detached, controller is attaching"
        );
    }

    #[test]
    fn test_attach_failure_names_stage() {
        let err = AttachFailure::new(AttachStage::Load, "script crashed");
        assert!(err.to_string().contains("load"));
        assert!(err.to_string().contains("script crashed"));
    }

    #[test]
    fn test_engine_error_displays_description() {
        let err = EngineError::new("process not found");
        assert_eq!(err.to_string(), "process not found");
        assert_eq!(err, EngineError("process not found".to_string()));
    }

    #[test]
    fn test_misaligned_batch_display() {
        let err = StanzaError::MisalignedBatch { len: 161, stride: 16 };
        assert_eq!(err.to_string(), "Trace batch of 161 bytes is not a multiple of 16");
    }
}
