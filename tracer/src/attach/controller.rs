//! # Attach Controller
//!
//! The caller-facing state machine. It owns the worker thread but never
//! touches the session or script; those live on the worker.
//!
//! ```text
//!              attach()             completion Ok
//!   Detached ───────────► Attaching ──────────────► Attached
//!      ▲                      │
//!      └──────────────────────┘
//!          completion Err
//! ```
//!
//! `attach()` returns as soon as the request is queued. Completions are
//! applied by [`AttachController::poll`] (or [`AttachController::poll_timeout`])
//! on the caller's thread, which is also where observers run.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::thread::JoinHandle;
use std::time::Duration;

use super::messages::{AttachCompletion, AttachRequest, RequestId, StateChange, WorkerCommand};
use super::worker;
use crate::aggregator::{EventAggregator, TraceUpdate};
use crate::domain::{AttachFailure, ControllerError, ControllerState, TargetProcess};
use crate::engine::Engine;
use crate::payload::PayloadConfig;

type Observer = Box<dyn FnMut(&StateChange) + Send>;

pub struct AttachController {
    state: ControllerState,
    next_request: u64,
    in_flight: Option<RequestId>,
    last_failure: Option<AttachFailure>,
    observers: Vec<Observer>,

    // None once disposed
    commands: Option<Sender<WorkerCommand>>,
    completions: Receiver<AttachCompletion>,
    worker: Option<JoinHandle<EventAggregator>>,
}

impl AttachController {
    /// Spawn the worker thread for `engine`
    ///
    /// # Errors
    /// [`ControllerError::WorkerSpawn`] if the thread cannot be started
    pub fn new<E: Engine>(engine: E) -> Result<Self, ControllerError> {
        Self::start(engine, None)
    }

    /// Like [`Self::new`], also publishing aggregator updates to `sink`
    ///
    /// Updates are dropped when `sink` is full; the worker never blocks on it.
    ///
    /// # Errors
    /// [`ControllerError::WorkerSpawn`] if the thread cannot be started
    pub fn with_event_sink<E: Engine>(
        engine: E,
        sink: Sender<TraceUpdate>,
    ) -> Result<Self, ControllerError> {
        Self::start(engine, Some(sink))
    }

    fn start<E: Engine>(
        engine: E,
        sink: Option<Sender<TraceUpdate>>,
    ) -> Result<Self, ControllerError> {
        let (command_tx, command_rx) = unbounded();
        let (completion_tx, completion_rx) = unbounded();

        let handle = worker::spawn(engine, command_rx, completion_tx, sink)
            .map_err(ControllerError::WorkerSpawn)?;

        Ok(Self {
            state: ControllerState::Detached,
            next_request: 1,
            in_flight: None,
            last_failure: None,
            observers: Vec::new(),
            commands: Some(command_tx),
            completions: completion_rx,
            worker: Some(handle),
        })
    }

    /// Request an attach to `target`, tracing traffic from `trigger_port`
    ///
    /// Returns once the request is queued; the outcome arrives through
    /// [`Self::poll`].
    ///
    /// # Errors
    /// - [`ControllerError::InvalidState`] unless the controller is detached
    /// - [`ControllerError::InvalidConfig`] for port 0
    /// - [`ControllerError::WorkerUnavailable`] if the worker has exited
    ///
    /// State is unchanged on every error.
    pub fn attach(
        &mut self,
        target: TargetProcess,
        trigger_port: u16,
    ) -> Result<(), ControllerError> {
        if self.state != ControllerState::Detached {
            return Err(ControllerError::InvalidState { current: self.state });
        }
        let config = PayloadConfig::new(trigger_port)?;

        let commands = self.commands.as_ref().ok_or(ControllerError::WorkerUnavailable)?;
        let id = RequestId(self.next_request);
        info!("Requesting attach to {target}, trigger port {trigger_port}");
        commands
            .send(WorkerCommand::Attach(AttachRequest { id, target, config }))
            .map_err(|_| ControllerError::WorkerUnavailable)?;

        self.next_request += 1;
        self.in_flight = Some(id);
        self.set_state(ControllerState::Attaching, None);
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Most recent attach failure, cleared by the next successful attach
    #[must_use]
    pub fn last_failure(&self) -> Option<&AttachFailure> {
        self.last_failure.as_ref()
    }

    /// Register a callback invoked on every state transition
    ///
    /// Callbacks run synchronously inside [`Self::attach`] and [`Self::poll`].
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Apply every completion that has arrived, without blocking
    ///
    /// Returns the number of completions processed.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Wait up to `timeout` for a completion, then apply whatever is pending
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        match self.completions.recv_timeout(timeout) {
            Ok(completion) => {
                self.apply(completion);
                1 + self.poll()
            }
            Err(_) => 0,
        }
    }

    /// Stop the worker and return its final aggregate
    ///
    /// Waits for an in-flight attach to finish; it is never aborted. A
    /// completion that arrives meanwhile is discarded.
    ///
    /// # Errors
    /// [`ControllerError::WorkerPanicked`] if the worker thread panicked
    pub fn dispose(mut self) -> Result<EventAggregator, ControllerError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<EventAggregator, ControllerError> {
        // Closing the command channel is the worker's stop signal
        self.commands = None;
        let handle = self.worker.take().ok_or(ControllerError::WorkerUnavailable)?;
        let joined = handle.join().map_err(|_| ControllerError::WorkerPanicked);

        let discarded = self.completions.try_iter().count();
        if discarded > 0 {
            debug!("Discarded {discarded} completion(s) at shutdown");
        }
        joined
    }

    fn apply(&mut self, completion: AttachCompletion) {
        if self.in_flight != Some(completion.request_id) {
            warn!("Discarding completion for stale request {}", completion.request_id.0);
            return;
        }
        self.in_flight = None;

        match completion.result {
            Ok(()) => {
                self.last_failure = None;
                self.set_state(ControllerState::Attached, None);
            }
            Err(failure) => {
                self.last_failure = Some(failure.clone());
                self.set_state(ControllerState::Detached, Some(failure));
            }
        }
    }

    fn set_state(&mut self, next: ControllerState, failure: Option<AttachFailure>) {
        if next == self.state {
            return;
        }

        let change = StateChange { previous: self.state, current: next, failure };
        debug!("Controller state {} -> {}", change.previous, change.current);
        self.state = next;
        for observer in &mut self.observers {
            observer(&change);
        }
    }
}

impl Drop for AttachController {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.shutdown() {
                warn!("Attach worker shutdown failed: {err}");
            }
        }
    }
}
