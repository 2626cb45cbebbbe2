//! # Attach Worker
//!
//! Runs on a dedicated thread and owns everything that blocks or touches the
//! engine: the engine handle, the live session and its script, and the
//! aggregator fed by the script's stanzas.
//!
//! ## Loop
//!
//! ```text
//!            commands (controller)          messages (script callback)
//!                   │                                 │
//!                   └──────────── select! ────────────┘
//!                                   │
//!              Attach ──► handle_attach ──► AttachCompletion
//!              message ─► on_message ────► EventAggregator ──► TraceUpdate sink
//! ```
//!
//! The loop ends when the controller drops its command sender. Messages still
//! queued at that point are discarded and any live session is detached.
//!
//! ## Script Generations
//!
//! Every script gets a generation number and its callback tags each message
//! with it. Only messages from the live script's generation are dispatched,
//! so output from a script whose load failed never reaches the aggregator.

use crossbeam_channel::{select, unbounded, Receiver, Sender, TrySendError};
use log::{debug, info, warn};
use std::io;
use std::thread::{self, JoinHandle};

use super::messages::{AttachCompletion, AttachRequest, ScriptMessage, WorkerCommand};
use crate::aggregator::{EventAggregator, TraceUpdate};
use crate::domain::{AttachFailure, AttachStage, EngineError, TargetProcess};
use crate::engine::{Engine, EngineScript, EngineSession};
use crate::payload::{build_payload, PayloadConfig};
use crate::protocol::{classify, Inbound};

/// Name of the worker thread, visible in debuggers and panic messages
pub const WORKER_THREAD_NAME: &str = "tracer-worker";

type ScriptOf<E> = <<E as Engine>::Session as EngineSession>::Script;

/// Start the worker thread
///
/// The thread's result is the final aggregator, handed back when the command
/// channel closes.
///
/// # Errors
/// Returns the OS error if the thread cannot be spawned
pub(crate) fn spawn<E: Engine>(
    engine: E,
    commands: Receiver<WorkerCommand>,
    completions: Sender<AttachCompletion>,
    updates: Option<Sender<TraceUpdate>>,
) -> io::Result<JoinHandle<EventAggregator>> {
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || AttachWorker::new(engine, completions, updates).run(&commands))
}

/// Session and script that are currently injected
///
/// Field order matters: the script is dropped before the session.
struct LiveSession<E: Engine> {
    _script: ScriptOf<E>,
    session: E::Session,
    generation: u64,
}

impl<E: Engine> LiveSession<E> {
    fn release(self) {
        let LiveSession { _script: script, mut session, generation } = self;
        drop(script);
        match session.detach() {
            Ok(()) => debug!("Detached session for script generation {generation}"),
            Err(err) => debug!("Ignoring detach error during shutdown: {err}"),
        }
    }
}

pub(crate) struct AttachWorker<E: Engine> {
    engine: E,
    live: Option<LiveSession<E>>,
    generation: u64,
    aggregator: EventAggregator,

    completions: Sender<AttachCompletion>,
    updates: Option<Sender<TraceUpdate>>,
    message_tx: Sender<ScriptMessage>,
    message_rx: Receiver<ScriptMessage>,
}

impl<E: Engine> AttachWorker<E> {
    pub(crate) fn new(
        engine: E,
        completions: Sender<AttachCompletion>,
        updates: Option<Sender<TraceUpdate>>,
    ) -> Self {
        let (message_tx, message_rx) = unbounded();
        Self {
            engine,
            live: None,
            generation: 0,
            aggregator: EventAggregator::new(),
            completions,
            updates,
            message_tx,
            message_rx,
        }
    }

    /// Serve commands and script messages until the command channel closes
    pub(crate) fn run(mut self, commands: &Receiver<WorkerCommand>) -> EventAggregator {
        let messages = self.message_rx.clone();

        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(WorkerCommand::Attach(request)) => self.handle_attach(request),
                    Err(_) => break,
                },
                recv(messages) -> message => {
                    if let Ok(message) = message {
                        self.on_message(message);
                    }
                }
            }
        }

        self.shutdown()
    }

    /// Perform one attach and emit its completion
    pub(crate) fn handle_attach(&mut self, request: AttachRequest) {
        let AttachRequest { id, target, config } = request;
        info!("Attaching to {target}");

        let result = self.attach(&target, &config);
        match &result {
            Ok(()) => info!("Instrumentation loaded in {target}"),
            Err(failure) => warn!("{failure}"),
        }

        if self.completions.send(AttachCompletion { request_id: id, result }).is_err() {
            debug!("Controller is gone, completion for request {} dropped", id.0);
        }
    }

    fn attach(
        &mut self,
        target: &TargetProcess,
        config: &PayloadConfig,
    ) -> Result<(), AttachFailure> {
        if self.live.is_some() {
            return Err(AttachFailure::new(
                AttachStage::Precondition,
                "a session is already attached",
            ));
        }

        let mut session = self.engine.attach(target).map_err(stage(AttachStage::Attach))?;

        self.generation += 1;
        let generation = self.generation;

        match self.inject(&mut session, config, generation) {
            Ok(script) => {
                self.live = Some(LiveSession { _script: script, session, generation });
                Ok(())
            }
            Err(failure) => {
                // The half-built script is already gone; only the primary failure is reported
                if let Err(err) = session.detach() {
                    debug!("Ignoring detach error after failed attach: {err}");
                }
                Err(failure)
            }
        }
    }

    fn inject(
        &self,
        session: &mut E::Session,
        config: &PayloadConfig,
        generation: u64,
    ) -> Result<ScriptOf<E>, AttachFailure> {
        let source = build_payload(config);
        let mut script =
            session.create_script(&source).map_err(stage(AttachStage::CreateScript))?;

        let message_tx = self.message_tx.clone();
        script
            .on_message(Box::new(move |raw| {
                // Unbounded: never blocks the engine's thread
                let _ = message_tx.send(ScriptMessage { generation, raw });
            }))
            .map_err(stage(AttachStage::Subscribe))?;

        script.load().map_err(stage(AttachStage::Load))?;
        Ok(script)
    }

    /// Classify one script message and route it to the aggregator
    pub(crate) fn on_message(&mut self, message: ScriptMessage) {
        let live_generation = self.live.as_ref().map(|live| live.generation);
        if live_generation != Some(message.generation) {
            debug!("Dropping message from inactive script generation {}", message.generation);
            return;
        }

        match classify(message.raw) {
            Ok(Inbound::Stanza(stanza)) => {
                // Misaligned batches are logged and counted by the aggregator
                if let Ok(Some(update)) = self.aggregator.on_stanza(stanza) {
                    self.publish(update);
                }
            }
            Ok(Inbound::Unclassified(value)) => {
                debug!("Unclassified engine message: {value}");
                self.aggregator.record_unclassified();
                self.publish(TraceUpdate::Unclassified(value));
            }
            Err(err) => self.aggregator.record_malformed(&err),
        }
    }

    fn publish(&mut self, update: TraceUpdate) {
        let Some(updates) = &self.updates else {
            return;
        };

        let disconnected = match updates.try_send(update) {
            Ok(()) => false,
            Err(TrySendError::Full(_)) => {
                debug!("Update sink full, dropping update");
                false
            }
            Err(TrySendError::Disconnected(_)) => true,
        };

        if disconnected {
            debug!("Update sink closed, no further updates will be published");
            self.updates = None;
        }
    }

    /// Route every queued script message
    #[cfg(test)]
    pub(crate) fn drain_messages(&mut self) {
        while let Ok(message) = self.message_rx.try_recv() {
            self.on_message(message);
        }
    }

    #[cfg(test)]
    pub(crate) fn aggregator(&self) -> &EventAggregator {
        &self.aggregator
    }

    pub(crate) fn shutdown(mut self) -> EventAggregator {
        if let Some(live) = self.live.take() {
            live.release();
        }
        self.aggregator.log_summary();
        self.aggregator
    }
}

fn stage(stage: AttachStage) -> impl Fn(EngineError) -> AttachFailure {
    move |err| AttachFailure::new(stage, err.0)
}
