//! Statistics sink interface.
//!
//! Aggregate statistics (online counts, completed games, origin
//! fingerprints) are recorded as a side effect of connection and message
//! events but persisted outside the core. The relay only ever talks to
//! this trait; counter persistence is best-effort by design.

/// Receiver for aggregate connection statistics.
///
/// Implementations must be cheap and non-blocking: these methods are called
/// from hot connection paths and must never stall a session task.
pub trait StatsSink: Send + Sync {
    /// A new connection was accepted.
    fn record_connect(&self);

    /// A session fully disconnected.
    fn record_disconnect(&self);

    /// A client reported completing its game.
    fn record_game_complete(&self);

    /// A connection arrived from the origin with this fingerprint
    /// (a non-reversible hash of the peer's network address).
    fn record_origin(&self, fingerprint: &str);
}

/// A sink that discards everything, for tests and embedded use.
#[derive(Debug, Default)]
pub struct NoStats;

impl StatsSink for NoStats {
    fn record_connect(&self) {}
    fn record_disconnect(&self) {}
    fn record_game_complete(&self) {}
    fn record_origin(&self, _fingerprint: &str) {}
}
