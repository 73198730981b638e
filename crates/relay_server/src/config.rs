//! Relay configuration types and defaults.
//!
//! This module contains the relay configuration structure and default values
//! used to initialize and customize the relay server behavior.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration structure for the relay server.
///
/// Contains all necessary parameters to configure relay behavior including
/// network settings, liveness timing, and logging verbosity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Interval between server-originated `Heartbeat` packets per session
    #[serde(with = "duration_secs")]
    pub heartbeat_interval: Duration,

    /// Upper bound on a single blocking read before the shutdown signal is
    /// re-checked; also the worst-case shutdown latency for an idle socket
    #[serde(with = "duration_secs")]
    pub read_poll_interval: Duration,

    /// Whether per-packet log lines are suppressed
    pub quiet_mode: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:43385".parse().expect("Invalid default bind address"),
            heartbeat_interval: Duration::from_secs(30),
            read_poll_interval: Duration::from_secs(2),
            quiet_mode: true,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
