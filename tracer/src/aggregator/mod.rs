//! Aggregation of the stanza stream
//!
//! Pure bookkeeping, separated from the worker that feeds it so it can be
//! tested without an engine.

pub mod event_aggregator;
pub mod summary;

pub use event_aggregator::EventAggregator;
pub use summary::{AggregateStats, TraceUpdate};
