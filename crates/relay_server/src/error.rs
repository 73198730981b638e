//! Error types and handling for the relay server.
//!
//! Per-session failures are contained to that session: an I/O error tears
//! down its own connection and nothing else, a malformed frame is skipped
//! without closing the stream, and read timeouts are part of the normal
//! liveness-poll cycle rather than errors at all.

/// Enumeration of possible relay errors.
///
/// Categorizes errors into network-related and internal errors to help
/// with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal errors such as configuration or state inconsistencies
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while encoding or decoding the wire protocol.
///
/// A `MalformedSegment` affects only the one frame it was found in; the
/// framer reports it and keeps consuming the stream.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A frame's bytes were not a valid JSON object
    #[error("Malformed packet segment: {0}")]
    MalformedSegment(#[source] serde_json::Error),

    /// A packet could not be serialized to JSON
    #[error("Failed to encode packet: {0}")]
    Encode(#[source] serde_json::Error),
}
