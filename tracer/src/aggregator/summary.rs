use serde_json::Value;
use std::fmt;

/// Counters maintained by the aggregator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregateStats {
    pub module_syncs: u64,
    pub intercepted_calls: u64,
    pub trace_batches: u64,
    pub trace_records: u64,
    /// Stanzas that failed to parse, plus misaligned trace batches
    pub malformed_stanzas: u64,
    /// Well-formed stanzas with a `(tag, source)` this build does not know
    pub unknown_stanzas: u64,
    /// Non-`send` engine messages
    pub unclassified_messages: u64,
}

impl fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syncs={} intercepted={} batches={} records={} malformed={} unknown={} unclassified={}",
            self.module_syncs,
            self.intercepted_calls,
            self.trace_batches,
            self.trace_records,
            self.malformed_stanzas,
            self.unknown_stanzas,
            self.unclassified_messages,
        )
    }
}

/// Incremental notification published by the attach worker
#[derive(Debug, Clone, PartialEq)]
pub enum TraceUpdate {
    /// Module table replaced
    ModulesSynced { modules: usize, exports: usize },
    /// One or more read entry points returned trigger-port data
    FunctionsIntercepted { names: Vec<String> },
    /// Trace batch accepted
    TraceBatch { records: usize, total_records: u64 },
    /// Out-of-band engine message, forwarded as-is
    Unclassified(Value),
}
