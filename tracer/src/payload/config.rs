//! Typed payload parameters

use crate::domain::ConfigError;

/// Parameters substituted into the instrumentation payload
///
/// The trigger port is the only externally supplied setting. Port 0 can never
/// be a socket peer, so it is rejected here rather than producing a payload
/// that silently never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadConfig {
    trigger_port: u16,
}

impl PayloadConfig {
    /// Validate and wrap a trigger port
    ///
    /// # Errors
    /// [`ConfigError::InvalidTriggerPort`] for port 0
    pub fn new(trigger_port: u16) -> Result<Self, ConfigError> {
        if trigger_port == 0 {
            return Err(ConfigError::InvalidTriggerPort(trigger_port));
        }
        Ok(Self { trigger_port })
    }

    #[must_use]
    pub fn trigger_port(&self) -> u16 {
        self.trigger_port
    }
}

impl TryFrom<u16> for PayloadConfig {
    type Error = ConfigError;

    fn try_from(trigger_port: u16) -> Result<Self, Self::Error> {
        Self::new(trigger_port)
    }
}
