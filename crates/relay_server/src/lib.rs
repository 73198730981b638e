//! # Relay Server - Room-Based Message Relay Core
//!
//! A TCP relay that accepts many concurrent client connections, groups them
//! into named rooms, and forwards opaque JSON messages between room members.
//! The relay inspects only a handful of routing fields (`type`, `roomId`,
//! `targetClientId`, `quiet`, `data`) and never interprets message payloads.
//!
//! ## Architecture
//!
//! * **Protocol** - NUL-terminated JSON framing over a raw TCP stream
//! * **Session** - One connected client: read loop, heartbeat loop, writer
//! * **Room** - Named membership set with roster and save-state coordination
//! * **Relay** - Registry of all sessions and rooms, plus privileged
//!   operator entry points (message/disable arbitrary sessions)
//! * **RelayServer** - The accept loop that turns sockets into sessions
//!
//! ## Message Flow
//!
//! 1. The accept loop wraps a socket in a [`Session`] and spawns its tasks
//! 2. The session's read loop feeds bytes to the [`Framer`]
//! 3. Each decoded packet is dispatched against the session's current room
//! 4. Rooms broadcast to members, unicast to a target, or queue save-state
//!    requests depending on the packet's routing fields
//!
//! ## Concurrency Model
//!
//! Every connection runs an independent read task and heartbeat task, and
//! every outbound send runs as its own spawned task, so one slow peer never
//! stalls delivery to others. Shared collections (room members, the session
//! and room registries) are guarded by `tokio::sync` locks, and broadcasts
//! fan out over a snapshot of the membership. Cross-connection ordering is
//! deliberately not guaranteed.
//!
//! ## Persistence & Administration
//!
//! Aggregate statistics and the operator console live outside this crate.
//! The core reports connection events through the [`StatsSink`] trait and
//! exposes read-only snapshots plus privileged send/disconnect operations
//! on [`Relay`] for whatever frontend drives it.

pub use config::RelayConfig;
pub use error::{ProtocolError, RelayError};
pub use protocol::{Framer, Packet, PacketKind};
pub use relay::Relay;
pub use room::Room;
pub use server::RelayServer;
pub use session::{Session, SessionId};
pub use stats::{NoStats, StatsSink};

// Public module declarations
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod room;
pub mod server;
pub mod session;
pub mod stats;

// Internal modules (not part of public API)
mod dispatch;

mod tests;
