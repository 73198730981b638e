//! Central registry for all active sessions and rooms.
//!
//! The relay owns the session and room collections, routes room creation,
//! allocates unique session identifiers, and exposes the read-only
//! snapshots and privileged send/disconnect operations the operator
//! console is built on. All collections use async-safe locks; the
//! check-then-insert sequences (id allocation, room creation) run under a
//! single write lock so concurrent callers cannot produce duplicates.

use crate::room::Room;
use crate::session::{Session, SessionId};
use crate::stats::StatsSink;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Registry of every active session and room, plus process-wide flags.
pub struct Relay {
    /// All currently connected sessions, keyed by identifier
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,

    /// All active rooms, keyed by room id
    rooms: RwLock<HashMap<String, Arc<Room>>>,

    /// Process-wide per-packet log suppression flag
    quiet: AtomicBool,

    /// Sink for aggregate connection statistics
    stats: Arc<dyn StatsSink>,
}

impl Relay {
    /// Creates an empty registry.
    pub fn new(quiet_mode: bool, stats: Arc<dyn StatsSink>) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
            quiet: AtomicBool::new(quiet_mode),
            stats,
        })
    }

    pub fn stats(&self) -> &Arc<dyn StatsSink> {
        &self.stats
    }

    /// Whether per-packet log lines are currently suppressed.
    pub fn quiet_mode(&self) -> bool {
        self.quiet.load(Ordering::Relaxed)
    }

    pub fn set_quiet_mode(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    /// Flips the quiet-mode flag and returns the new value.
    pub fn toggle_quiet_mode(&self) -> bool {
        !self.quiet.fetch_xor(true, Ordering::Relaxed)
    }

    /// Registers a new session around the write half of an accepted socket.
    ///
    /// The identifier is rolled randomly and re-rolled while any registered
    /// session holds the same value; the check and the insert happen under
    /// one write lock, so concurrent registrations cannot collide.
    pub async fn register_session(
        self: &Arc<Self>,
        writer: OwnedWriteHalf,
        peer_addr: SocketAddr,
        heartbeat_interval: Duration,
        read_poll_interval: Duration,
    ) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;

        let mut id: SessionId = rand::random();
        while sessions.contains_key(&id) {
            debug!("session id {id} already in use, re-rolling");
            id = rand::random();
        }

        let session = Arc::new(Session::new(
            id,
            peer_addr,
            writer,
            self.clone(),
            heartbeat_interval,
            read_poll_interval,
        ));
        sessions.insert(id, session.clone());
        info!("[{id}] connected from {peer_addr}");
        session
    }

    /// Returns the room with the given key, creating and registering it if
    /// no such room exists. First creator wins under concurrency; there is
    /// never more than one room per key.
    pub async fn get_or_create_room(self: &Arc<Self>, room_id: &str) -> Arc<Room> {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(room_id) {
            return room.clone();
        }

        let room = Arc::new(Room::new(room_id, self.clone()));
        rooms.insert(room_id.to_string(), room.clone());
        info!("[Room {room_id}] created");
        room
    }

    /// Removes a session from the registry. Idempotent.
    pub async fn remove_session(&self, id: SessionId) {
        self.sessions.write().await.remove(&id);
    }

    /// Removes a room from the registry. Idempotent.
    pub async fn remove_room(&self, room_id: &str) {
        self.rooms.write().await.remove(room_id);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Looks up a session by identifier.
    pub async fn find_session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// A snapshot of every connected session.
    pub async fn sessions_snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// A snapshot of every active room.
    pub async fn rooms_snapshot(&self) -> Vec<Arc<Room>> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// Privileged operator send: delivers a `SERVER_MESSAGE` to one
    /// session. Returns `false` when no session holds that id.
    pub async fn message_session(&self, id: SessionId, message: &str) -> bool {
        match self.find_session(id).await {
            Some(session) => {
                session.send_server_message(message).await;
                true
            }
            None => false,
        }
    }

    /// Privileged operator send to every connected session.
    pub async fn message_all(&self, message: &str) {
        for session in self.sessions_snapshot().await {
            let message = message.to_string();
            tokio::spawn(async move {
                session.send_server_message(&message).await;
            });
        }
    }

    /// Privileged disable: notifies one session, instructs it to disable
    /// the feature, and disconnects it. Returns `false` when no session
    /// holds that id.
    pub async fn disable_session(&self, id: SessionId, message: &str) -> bool {
        match self.find_session(id).await {
            Some(session) => {
                let message = message.to_string();
                tokio::spawn(async move {
                    session.send_disable(&message).await;
                });
                true
            }
            None => false,
        }
    }

    /// Privileged disable of every connected session.
    pub async fn disable_all(&self, message: &str) {
        for session in self.sessions_snapshot().await {
            let message = message.to_string();
            tokio::spawn(async move {
                session.send_disable(&message).await;
            });
        }
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("quiet", &self.quiet_mode())
            .finish_non_exhaustive()
    }
}
