//! Runtime tunables of the driver.

use serde::Deserialize;

/// Timeouts and size limits used by the driver.
///
/// Every field has a default matching the MC20 firmware behaviour, so a
/// configuration document only needs to list what it changes.
///
/// # Examples
///
/// ```rust
/// use libgsm::modem::Config;
///
/// let config = Config::from_json(br#"{"ack_poll_limit": 20}"#).unwrap();
/// assert_eq!(config.ack_poll_limit, 20);
/// assert_eq!(config.command_timeout_ms, Config::default().command_timeout_ms);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deadline for ordinary command replies.
    pub command_timeout_ms: u32,
    /// Deadline for each field of a reply or notification body, and for each
    /// payload byte during a bulk read.
    pub stream_timeout_ms: u32,
    /// Deadline of each matcher pass made by the maintenance pump.
    pub pump_timeout_ms: u32,
    /// Pause between unacknowledged-bytes polls after a plain send.
    pub ack_poll_interval_ms: u32,
    /// Polls allowed before a send is reported as unacknowledged.
    pub ack_poll_limit: u32,
    /// Bytes requested per eager pull on a secure socket.
    pub secure_read_chunk: usize,
    /// Largest payload accepted by a single send command.
    pub max_send_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_ms: 1_000,
            stream_timeout_ms: 1_000,
            pump_timeout_ms: 10,
            ack_poll_interval_ms: 200,
            ack_poll_limit: 150,
            secure_read_chunk: 1_500,
            max_send_len: 1_460,
        }
    }
}

impl Config {
    /// Parse a JSON configuration document. Missing fields keep their
    /// defaults.
    pub fn from_json(json: &[u8]) -> Result<Self, serde_json_core::de::Error> {
        serde_json_core::from_slice::<Config>(json).map(|(config, _)| config)
    }

    /// Upper bound on the time a plain send may spend waiting for acks.
    pub fn ack_drain_budget_ms(&self) -> u64 {
        self.ack_poll_interval_ms as u64 * self.ack_poll_limit as u64
    }
}
