//! # Payload Rendering
//!
//! The agent body (`agent.js`) is static. Everything that varies, or that
//! must match the controller's stanza parser, is emitted as a prelude of
//! constant declarations in front of it:
//!
//! ```text
//! 'use strict';
//! const TRIGGER_PORT = 4444;
//! const TAG_SYNC = "+sync";
//! ...
//! Stalker.trustThreshold = 2000;
//! ...
//! <agent.js>
//! ```

use serde_json::Value;
use std::io::{self, Write};
use tracer_common::{
    SOURCE_FUNCTIONS, SOURCE_MODULES, SOURCE_TRACE_EVENTS, STALKER_QUEUE_CAPACITY,
    STALKER_QUEUE_DRAIN_INTERVAL_MS, STALKER_TRUST_THRESHOLD, TAG_ADD, TAG_SYNC,
};

use super::config::PayloadConfig;

const AGENT_SOURCE: &str = include_str!("agent.js");

/// Render the complete instrumentation source for `config`
#[must_use]
pub fn build_payload(config: &PayloadConfig) -> String {
    let mut source = render_prelude(config);
    source.push_str(AGENT_SOURCE);
    source
}

/// Write the rendered source to `writer`
///
/// # Errors
/// Returns an error if writing fails
pub fn write_payload<W: Write>(config: &PayloadConfig, mut writer: W) -> io::Result<()> {
    writer.write_all(build_payload(config).as_bytes())?;
    writer.flush()
}

fn render_prelude(config: &PayloadConfig) -> String {
    // JSON string literals are valid JavaScript string literals
    let js = |text: &str| Value::from(text).to_string();

    format!(
        "'use strict';\n\
         \n\
         const TRIGGER_PORT = {port};\n\
         const TAG_SYNC = {tag_sync};\n\
         const TAG_ADD = {tag_add};\n\
         const SOURCE_MODULES = {modules};\n\
         const SOURCE_FUNCTIONS = {functions};\n\
         const SOURCE_TRACE_EVENTS = {events};\n\
         \n\
         Stalker.trustThreshold = {trust};\n\
         Stalker.queueCapacity = {capacity};\n\
         Stalker.queueDrainInterval = {drain};\n\
         \n",
        port = config.trigger_port(),
        tag_sync = js(TAG_SYNC),
        tag_add = js(TAG_ADD),
        modules = js(SOURCE_MODULES),
        functions = js(SOURCE_FUNCTIONS),
        events = js(SOURCE_TRACE_EVENTS),
        trust = STALKER_TRUST_THRESHOLD,
        capacity = STALKER_QUEUE_CAPACITY,
        drain = STALKER_QUEUE_DRAIN_INTERVAL_MS,
    )
}
