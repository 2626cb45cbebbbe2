//! # Instrumentation Engine Seam
//!
//! The engine that actually injects code into a process and runs the payload
//! is an external collaborator. This module names the capability the attach
//! worker needs from it, and nothing more:
//!
//! ```text
//! Engine::attach(target)            -> Session
//! Session::create_script(source)    -> Script
//! Script::on_message(handler)
//! Script::load()
//! Session::detach()
//! ```
//!
//! Sessions and scripts never leave the worker thread, so only the engine
//! itself has to be `Send`.

use serde_json::Value;

use crate::domain::{EngineError, TargetProcess};

/// Result alias for engine calls
pub type EngineResult<T> = Result<T, EngineError>;

/// Callback invoked by the engine for every message the script sends
///
/// Engines may call it from their own threads. It must return quickly; the
/// worker's handler only enqueues the message.
pub type MessageHandler = Box<dyn FnMut(RawMessage) + Send + 'static>;

/// Entry point of an instrumentation engine
pub trait Engine: Send + 'static {
    type Session: EngineSession;

    /// Attach to a running process
    ///
    /// # Errors
    /// Engine-defined failure for invalid or inaccessible targets
    fn attach(&mut self, target: &TargetProcess) -> EngineResult<Self::Session>;
}

/// A live connection to one target process
pub trait EngineSession {
    type Script: EngineScript;

    /// Compile a payload inside the target
    ///
    /// # Errors
    /// Engine-defined failure, e.g. a syntax error in `source`
    fn create_script(&mut self, source: &str) -> EngineResult<Self::Script>;

    /// Tear the connection down
    ///
    /// # Errors
    /// Engine-defined failure; callers releasing a half-built session ignore it
    fn detach(&mut self) -> EngineResult<()>;
}

/// A compiled payload bound to one session
pub trait EngineScript {
    /// Register the callback for messages sent by the payload
    ///
    /// # Errors
    /// Engine-defined failure
    fn on_message(&mut self, handler: MessageHandler) -> EngineResult<()>;

    /// Start executing the payload
    ///
    /// # Errors
    /// Engine-defined failure, e.g. the payload threw during initialization
    fn load(&mut self) -> EngineResult<()>;
}

/// A message as delivered by the engine, before classification
///
/// `message` is the structured envelope (`{"type": ..., ...}`); `data` is the
/// optional binary attachment passed alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub message: Value,
    pub data: Option<Vec<u8>>,
}

impl RawMessage {
    #[must_use]
    pub fn new(message: Value, data: Option<Vec<u8>>) -> Self {
        Self { message, data }
    }

    /// Build from the JSON text most engines hand out
    ///
    /// # Errors
    /// Returns the JSON error when `text` is not valid JSON
    pub fn from_json(text: &str, data: Option<Vec<u8>>) -> Result<Self, serde_json::Error> {
        Ok(Self { message: serde_json::from_str(text)?, data })
    }
}
