//! # Event Aggregation
//!
//! Consumes stanzas from the attach worker and keeps derived summaries.
//!
//! ## Stanza Routing
//!
//! - `+sync /process/modules` → replace the module table
//! - `+add /interceptor/functions` → append interception records (no dedup)
//! - `+add /stalker/events` → count trace records (16-byte stride)
//! - anything else → counted as unknown, otherwise ignored
//!
//! Malformed input is logged and counted; nothing here panics or returns a
//! fatal error.

use log::{debug, info, warn};
use serde_json::Value;

use super::summary::{AggregateStats, TraceUpdate};
use crate::domain::{Address, StanzaError};
use crate::protocol::{
    AddStanza, InterceptedFunction, ModuleRecord, Stanza, SyncStanza, TraceEventBatch,
};

/// Derived view of everything the payload has reported
#[derive(Debug, Default)]
pub struct EventAggregator {
    modules: Vec<ModuleRecord>,
    intercepted: Vec<InterceptedFunction>,
    stats: AggregateStats,
}

impl EventAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a classified stanza
    ///
    /// Returns the update to publish, if the stanza changed anything.
    ///
    /// # Errors
    /// Propagates [`StanzaError::MisalignedBatch`] from [`Self::on_add`]
    pub fn on_stanza(&mut self, stanza: Stanza) -> Result<Option<TraceUpdate>, StanzaError> {
        match stanza {
            Stanza::Sync(sync) => Ok(self.on_sync(sync)),
            Stanza::Add(add) => self.on_add(add),
            Stanza::Unknown { tag, source, payload } => {
                self.on_unknown(&tag, &source, &payload);
                Ok(None)
            }
        }
    }

    /// Apply a snapshot stanza
    pub fn on_sync(&mut self, stanza: SyncStanza) -> Option<TraceUpdate> {
        match stanza {
            SyncStanza::Modules(modules) => {
                let exports = modules.iter().map(|m| m.exports.len()).sum();
                let count = modules.len();
                // Snapshot semantics: the new table fully supersedes the old one
                self.modules = modules;
                self.stats.module_syncs += 1;
                debug!("Module table replaced: {count} modules, {exports} exports");
                Some(TraceUpdate::ModulesSynced { modules: count, exports })
            }
            SyncStanza::Unknown { source, payload } => {
                self.on_unknown(tracer_common::TAG_SYNC, &source, &payload);
                None
            }
        }
    }

    /// Apply an incremental stanza
    ///
    /// # Errors
    /// [`StanzaError::MisalignedBatch`] when a trace batch is not a whole
    /// number of records. The batch is dropped and counted as malformed; the
    /// running totals are left untouched.
    pub fn on_add(&mut self, stanza: AddStanza) -> Result<Option<TraceUpdate>, StanzaError> {
        match stanza {
            AddStanza::InterceptedFunctions(functions) => {
                let names: Vec<String> = functions.iter().map(|f| f.name.clone()).collect();
                self.stats.intercepted_calls += functions.len() as u64;
                self.intercepted.extend(functions);
                Ok(Some(TraceUpdate::FunctionsIntercepted { names }))
            }
            AddStanza::TraceEvents(batch) => self.on_trace_batch(&batch).map(Some),
            AddStanza::Unknown { source, payload, .. } => {
                self.on_unknown(tracer_common::TAG_ADD, &source, &payload);
                Ok(None)
            }
        }
    }

    fn on_trace_batch(&mut self, batch: &TraceEventBatch) -> Result<TraceUpdate, StanzaError> {
        let records = match batch.record_count() {
            Ok(records) => records,
            Err(err) => {
                self.record_malformed(&err);
                return Err(err);
            }
        };

        if batch.size_mismatch() {
            debug!(
                "Trace batch declares {:?} bytes but carries {}",
                batch.declared_size,
                batch.data.len()
            );
        }

        self.stats.trace_batches += 1;
        self.stats.trace_records += records as u64;
        Ok(TraceUpdate::TraceBatch { records, total_records: self.stats.trace_records })
    }

    fn on_unknown(&mut self, tag: &str, source: &str, payload: &Value) {
        self.stats.unknown_stanzas += 1;
        debug!("Ignoring stanza {tag} {source}: {payload}");
    }

    /// Count a stanza that could not be used
    pub fn record_malformed(&mut self, err: &StanzaError) {
        self.stats.malformed_stanzas += 1;
        warn!("Malformed stanza: {err}");
    }

    /// Count an out-of-band message from the engine
    pub fn record_unclassified(&mut self) {
        self.stats.unclassified_messages += 1;
    }

    /// Module table from the latest snapshot, in payload order
    #[must_use]
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    /// Every interception reported so far, duplicates included
    #[must_use]
    pub fn intercepted_functions(&self) -> &[InterceptedFunction] {
        &self.intercepted
    }

    /// Module whose mapping contains `addr`
    #[must_use]
    pub fn find_module(&self, addr: Address) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.contains(addr))
    }

    #[must_use]
    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    /// One-line summary at info level
    pub fn log_summary(&self) {
        info!(
            "Trace summary: {} modules, {} interceptions, {}",
            self.modules.len(),
            self.intercepted.len(),
            self.stats
        );
    }
}
