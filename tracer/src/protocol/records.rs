//! Records carried inside stanza payloads

use serde::Deserialize;
use tracer_common::{trace_record_count, TRACE_RECORD_SIZE};

use crate::domain::{Address, StanzaError};

/// A module loaded in the target process
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    #[serde(rename = "address")]
    pub base_address: Address,
    pub size: u64,
    /// Exports in the order the payload enumerated them
    #[serde(default)]
    pub exports: Vec<ExportRecord>,
}

impl ModuleRecord {
    /// Check if an address falls within this module's mapping
    #[must_use]
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.base_address && addr < self.base_address.offset(self.size)
    }
}

/// An exported symbol of a module
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub address: Address,
}

/// A read entry point that returned data from the trigger port
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterceptedFunction {
    pub name: String,
}

/// One drained batch of execution-trace records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEventBatch {
    /// Raw records, [`TRACE_RECORD_SIZE`] bytes each
    pub data: Vec<u8>,
    /// Byte count the payload claims to have sent (`payload.size`)
    pub declared_size: Option<u64>,
}

impl TraceEventBatch {
    /// Number of records in the batch
    ///
    /// # Errors
    /// [`StanzaError::MisalignedBatch`] when the attachment is not a whole
    /// number of records
    pub fn record_count(&self) -> Result<usize, StanzaError> {
        trace_record_count(self.data.len()).ok_or(StanzaError::MisalignedBatch {
            len: self.data.len(),
            stride: TRACE_RECORD_SIZE,
        })
    }

    /// True when the payload's declared size disagrees with the attachment
    #[must_use]
    pub fn size_mismatch(&self) -> bool {
        self.declared_size.is_some_and(|size| size != self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(len: usize) -> TraceEventBatch {
        TraceEventBatch { data: vec![0u8; len], declared_size: None }
    }

    #[test]
    fn test_record_count_160_bytes() {
        assert_eq!(batch(160).record_count(), Ok(10));
    }

    #[test]
    fn test_record_count_161_bytes_is_misaligned() {
        assert_eq!(
            batch(161).record_count(),
            Err(StanzaError::MisalignedBatch { len: 161, stride: 16 })
        );
    }

    #[test]
    fn test_size_mismatch() {
        let mut b = batch(32);
        assert!(!b.size_mismatch());
        b.declared_size = Some(32);
        assert!(!b.size_mismatch());
        b.declared_size = Some(48);
        assert!(b.size_mismatch());
    }

    #[test]
    fn test_module_contains() {
        let module = ModuleRecord {
            name: "libc.so.6".to_string(),
            base_address: Address(0x1000),
            size: 0x1000,
            exports: Vec::new(),
        };

        assert!(module.contains(Address(0x1000)));
        assert!(module.contains(Address(0x1FFF)));
        assert!(!module.contains(Address(0x0FFF)));
        assert!(!module.contains(Address(0x2000)));
    }

    #[test]
    fn test_module_deserializes_wire_shape() {
        let json = r#"{
            "name": "libSystem.B.dylib",
            "address": "0x7fff80000000",
            "size": 4096,
            "exports": [
                { "name": "recv", "address": "0x7fff80000100" },
                { "name": "read", "address": "0x7fff80000080" }
            ]
        }"#;
        let module: ModuleRecord = serde_json::from_str(json).unwrap();

        assert_eq!(module.base_address, Address(0x7fff_8000_0000));
        assert_eq!(module.exports.len(), 2);
        assert_eq!(module.exports[0].name, "recv");
        assert_eq!(module.exports[1].name, "read");
    }
}
