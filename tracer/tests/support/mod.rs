//! Scripted engine shared by the integration tests

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracer::domain::{AttachStage, EngineError, TargetProcess};
use tracer::engine::{Engine, EngineResult, EngineScript, EngineSession, MessageHandler, RawMessage};

/// Observations shared between a test and the engine running on the worker
#[derive(Default)]
pub struct Probe {
    calls: Mutex<Vec<String>>,
    handler: Mutex<Option<MessageHandler>>,
    sources: Mutex<Vec<String>>,
}

impl Probe {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Sessions attached and not yet detached
    pub fn live_sessions(&self) -> usize {
        let calls = self.calls();
        let attached = calls.iter().filter(|c| c.starts_with("attach")).count();
        let detached = calls.iter().filter(|c| *c == "detach").count();
        attached - detached
    }

    /// Payload sources passed to `create_script`
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }

    /// Deliver a message as if the loaded script had sent it
    pub fn emit(&self, message: Value, data: Option<Vec<u8>>) {
        if let Some(handler) = self.handler.lock().unwrap().as_mut() {
            handler(RawMessage::new(message, data));
        }
    }
}

pub struct ScriptedEngine {
    pub probe: Arc<Probe>,
    pub fail_at: Option<AttachStage>,
    pub detach_fails: bool,
    /// When set, `attach` blocks until a value arrives
    pub gate: Option<Receiver<()>>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let engine =
            Self { probe: Arc::clone(&probe), fail_at: None, detach_fails: false, gate: None };
        (engine, probe)
    }

    pub fn failing_at(mut self, stage: AttachStage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    pub fn with_failing_detach(mut self) -> Self {
        self.detach_fails = true;
        self
    }

    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn check(fail_at: Option<AttachStage>, stage: AttachStage) -> EngineResult<()> {
        if fail_at == Some(stage) {
            Err(EngineError::new(format!("scripted {stage} failure")))
        } else {
            Ok(())
        }
    }
}

pub struct ScriptedSession {
    probe: Arc<Probe>,
    fail_at: Option<AttachStage>,
    detach_fails: bool,
}

pub struct ScriptedScript {
    probe: Arc<Probe>,
    fail_at: Option<AttachStage>,
    handler: Option<MessageHandler>,
}

impl Engine for ScriptedEngine {
    type Session = ScriptedSession;

    fn attach(&mut self, target: &TargetProcess) -> EngineResult<ScriptedSession> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        Self::check(self.fail_at, AttachStage::Attach)?;
        self.probe.record(format!("attach {}", target.pid.0));
        Ok(ScriptedSession {
            probe: Arc::clone(&self.probe),
            fail_at: self.fail_at,
            detach_fails: self.detach_fails,
        })
    }
}

impl EngineSession for ScriptedSession {
    type Script = ScriptedScript;

    fn create_script(&mut self, source: &str) -> EngineResult<ScriptedScript> {
        self.probe.sources.lock().unwrap().push(source.to_string());
        ScriptedEngine::check(self.fail_at, AttachStage::CreateScript)?;
        self.probe.record("create_script");
        Ok(ScriptedScript { probe: Arc::clone(&self.probe), fail_at: self.fail_at, handler: None })
    }

    fn detach(&mut self) -> EngineResult<()> {
        self.probe.record("detach");
        if self.detach_fails {
            return Err(EngineError::new("session already gone"));
        }
        Ok(())
    }
}

impl EngineScript for ScriptedScript {
    fn on_message(&mut self, handler: MessageHandler) -> EngineResult<()> {
        ScriptedEngine::check(self.fail_at, AttachStage::Subscribe)?;
        self.handler = Some(handler);
        Ok(())
    }

    fn load(&mut self) -> EngineResult<()> {
        ScriptedEngine::check(self.fail_at, AttachStage::Load)?;
        self.probe.record("load");
        // Loaded: the test can now speak for the script
        *self.probe.handler.lock().unwrap() = self.handler.take();
        Ok(())
    }
}

pub fn modules_sync(names: &[&str]) -> Value {
    let items: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "name": name,
                "address": format!("{:#x}", 0x40_0000 + i * 0x10_0000),
                "size": 0x1000,
                "exports": [{"name": "main", "address": format!("{:#x}", 0x40_0100 + i * 0x10_0000)}]
            })
        })
        .collect();
    send("+sync", "/process/modules", json!({ "items": items }))
}

pub fn function_hit(name: &str) -> Value {
    send("+add", "/interceptor/functions", json!({ "items": [{ "name": name }] }))
}

pub fn trace_events(len: usize) -> Value {
    send("+add", "/stalker/events", json!({ "size": len }))
}

pub fn send(tag: &str, source: &str, payload: Value) -> Value {
    json!({
        "type": "send",
        "payload": { "name": tag, "from": source, "payload": payload }
    })
}
