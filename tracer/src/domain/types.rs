//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep process ids and target-process addresses from
//! being mixed up with sizes, counts and ports in function signatures.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Process ID
///
/// Identifies the process the instrumentation engine attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// Address in the target process's address space
///
/// The payload reports addresses as `0x`-prefixed hex strings because
/// JavaScript numbers cannot hold a full 64-bit pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl Address {
    /// Parse a `0x`-prefixed (or bare) hex string
    ///
    /// Returns `None` for empty or non-hex input.
    #[must_use]
    pub fn parse_hex(text: &str) -> Option<Self> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.is_empty() {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Address)
    }

    /// Address `offset` bytes past this one, saturating at the top of the address space
    #[must_use]
    pub fn offset(self, offset: u64) -> Self {
        Address(self.0.saturating_add(offset))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::parse_hex(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex address: {text:?}")))
    }
}

/// The process an attach request targets
///
/// `name` is informational only; the engine attaches by pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProcess {
    pub pid: Pid,
    pub name: Option<String>,
}

impl TargetProcess {
    /// Target identified by pid alone
    #[must_use]
    pub fn from_pid(pid: u32) -> Self {
        Self { pid: Pid(pid), name: None }
    }

    /// Target with a display name (as shown by a process picker)
    #[must_use]
    pub fn named(pid: u32, name: impl Into<String>) -> Self {
        Self { pid: Pid(pid), name: Some(name.into()) }
    }
}

impl fmt::Display for TargetProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.pid),
            None => write!(f, "{}", self.pid),
        }
    }
}

/// Attach state of a controller
///
/// ```text
/// Detached --attach--> Attaching --success--> Attached
///     ^                    |
///     +------failure-------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControllerState {
    #[default]
    Detached,
    Attaching,
    Attached,
}

impl ControllerState {
    /// Lowercase name, as published to observers
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ControllerState::Detached => "detached",
            ControllerState::Attaching => "attaching",
            ControllerState::Attached => "attached",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_state_starts_detached() {
        assert_eq!(ControllerState::default(), ControllerState::Detached);
        assert_eq!(ControllerState::Attaching.to_string(), "attaching");
    }

    #[test]
    fn test_parse_hex_address() {
        assert_eq!(Address::parse_hex("0x7fff0000"), Some(Address(0x7fff_0000)));
        assert_eq!(Address::parse_hex("1000"), Some(Address(0x1000)));
        assert_eq!(Address::parse_hex("0x"), None);
        assert_eq!(Address::parse_hex("0xzz"), None);
    }

    #[test]
    fn test_address_display_roundtrips_through_parse() {
        let addr = Address(0x1_0000_2000);
        assert_eq!(addr.to_string(), "0x100002000");
        assert_eq!(Address::parse_hex(&addr.to_string()), Some(addr));
    }

    #[test]
    fn test_deserialize_address_from_json_string() {
        let addr: Address = serde_json::from_str("\"0xdeadbeef\"").unwrap();
        assert_eq!(addr, Address(0xdead_beef));

        let bad: Result<Address, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_target_display() {
        assert_eq!(TargetProcess::from_pid(42).to_string(), "PID:42");
        assert_eq!(TargetProcess::named(42, "nginx").to_string(), "nginx (PID:42)");
    }
}
