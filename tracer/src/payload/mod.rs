//! Instrumentation payload builder
//!
//! Produces the agent source that the engine compiles inside the target.
//! The only parameter is the trigger port, carried by [`PayloadConfig`].

pub mod builder;
pub mod config;

pub use builder::{build_payload, write_payload};
pub use config::PayloadConfig;
