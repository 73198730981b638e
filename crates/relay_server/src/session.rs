//! Connection session: one client's socket and its associated tasks.
//!
//! Each accepted connection becomes a [`Session`] running two independent
//! tasks: a read loop that frames and dispatches inbound packets, and a
//! heartbeat loop that pings the peer on a fixed interval. Disconnection is
//! a one-shot signal observed by both loops and is safe to request from
//! multiple concurrent triggers (a failed write, a protocol error, and an
//! operator disable command may all race).

use crate::dispatch;
use crate::protocol::{self, Packet, DEFAULT_DISCONNECT_MESSAGE};
use crate::relay::Relay;
use crate::room::Room;
use serde_json::{Map, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Randomly assigned 32-bit session identifier, unique among currently
/// connected sessions.
pub type SessionId = u32;

/// Size of a single socket read.
const READ_CHUNK: usize = 1024;

/// One connected client.
///
/// Holds the write half of the socket (the read half is owned by the read
/// loop), the last-known opaque data blob from the client's most recent
/// `UPDATE_CLIENT_DATA` packet, a back-reference to at most one room, and
/// the shutdown signal shared by both loops.
pub struct Session {
    /// Unique identifier for this session
    id: SessionId,

    /// Remote address of the peer
    peer_addr: SocketAddr,

    /// Write half of the socket, serialized across concurrent senders
    writer: Mutex<OwnedWriteHalf>,

    /// Last-known opaque client data blob, echoed in roster broadcasts
    data: RwLock<Map<String, Value>>,

    /// The room this session currently belongs to, if any
    room: Mutex<Option<Arc<Room>>>,

    /// Registry this session is registered with
    relay: Arc<Relay>,

    /// Set exactly once, by whichever disconnect trigger wins the race
    closed: AtomicBool,

    /// One-shot shutdown signal observed by the read and heartbeat loops
    shutdown: broadcast::Sender<()>,

    /// Interval between server-originated heartbeat packets
    heartbeat_interval: Duration,

    /// Bound on a single blocking read before the shutdown flag is re-checked
    read_poll_interval: Duration,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        writer: OwnedWriteHalf,
        relay: Arc<Relay>,
        heartbeat_interval: Duration,
        read_poll_interval: Duration,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            id,
            peer_addr,
            writer: Mutex::new(writer),
            data: RwLock::new(Map::new()),
            room: Mutex::new(None),
            relay,
            closed: AtomicBool::new(false),
            shutdown,
            heartbeat_interval,
            read_poll_interval,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub(crate) fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Whether disconnection has been requested for this session.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// A copy of the last-known client data blob.
    pub async fn data_snapshot(&self) -> Map<String, Value> {
        self.data.read().await.clone()
    }

    pub(crate) async fn set_data(&self, data: Map<String, Value>) {
        *self.data.write().await = data;
    }

    /// The room this session currently belongs to, if any.
    pub async fn room(&self) -> Option<Arc<Room>> {
        self.room.lock().await.clone()
    }

    /// The session's room slot. [`Room::join`] holds this lock across the
    /// closed check, the membership insert, and the slot assignment so a
    /// session can never end up a member of two rooms, or a member of any
    /// room after teardown has begun.
    pub(crate) fn room_slot(&self) -> &Mutex<Option<Arc<Room>>> {
        &self.room
    }

    pub(crate) async fn clear_room(&self) {
        *self.room.lock().await = None;
    }

    /// Read loop: bounded-duration reads so an idle socket still observes
    /// the shutdown signal within one poll interval.
    ///
    /// Bytes are fed to the framer in arrival order; each decoded packet is
    /// dispatched as its own task so a slow broadcast cannot stall this
    /// connection's reader.
    pub(crate) async fn read_loop(self: Arc<Self>, mut reader: OwnedReadHalf) {
        let mut framer = protocol::Framer::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if self.is_closed() {
                return;
            }

            match timeout(self.read_poll_interval, reader.read(&mut chunk)).await {
                // Poll timeout: re-check the shutdown flag and retry
                Err(_) => continue,
                Ok(Ok(0)) => {
                    debug!("[{}] peer closed the connection", self.id);
                    self.disconnect().await;
                    return;
                }
                Ok(Ok(n)) => {
                    for packet in framer.feed(&chunk[..n]) {
                        let session = self.clone();
                        tokio::spawn(async move {
                            dispatch::handle_packet(session, packet).await;
                        });
                    }
                }
                Ok(Err(e)) => {
                    if !self.is_closed() {
                        warn!("[{}] error reading from connection: {e}", self.id);
                    }
                    self.disconnect().await;
                    return;
                }
            }
        }
    }

    /// Heartbeat loop: sends a `Heartbeat` packet on a fixed interval,
    /// independent of application traffic, until shutdown.
    pub(crate) async fn heartbeat_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.recv() => return,
                _ = sleep(self.heartbeat_interval) => {
                    if self.is_closed() {
                        return;
                    }
                    let session = self.clone();
                    tokio::spawn(async move {
                        session.send_packet(Packet::heartbeat()).await;
                    });
                }
            }
        }
    }

    /// Encodes and writes a packet to the socket.
    ///
    /// A write failure is fatal to this session only: it is logged and
    /// triggers disconnection without affecting other sessions.
    pub async fn send_packet(&self, packet: Packet) {
        if !packet.quiet_or(false) && !self.relay.quiet_mode() {
            info!("[{}] <- {} packet", self.id, packet.type_name());
        }

        let bytes = match protocol::encode(&packet) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("[{}] {e}", self.id);
                return;
            }
        };

        let write_result = {
            let mut writer = self.writer.lock().await;
            writer.write_all(&bytes).await
        };

        if let Err(e) = write_result {
            if !self.is_closed() {
                warn!("[{}] error sending packet: {e}", self.id);
            }
            self.disconnect().await;
        }
    }

    /// Sends a `SERVER_MESSAGE` notice, substituting the default text when
    /// the operator supplied none.
    pub async fn send_server_message(&self, message: &str) {
        let message = if message.is_empty() {
            DEFAULT_DISCONNECT_MESSAGE
        } else {
            message
        };
        self.send_packet(Packet::server_message(message)).await;
    }

    /// Notifies the peer, instructs it to disable the feature, and
    /// disconnects the session.
    pub async fn send_disable(&self, message: &str) {
        self.send_server_message(message).await;
        self.send_packet(Packet::disable_anchor()).await;
        self.disconnect().await;
    }

    /// Tears the session down: signals both loops, detaches from the room
    /// and the registry, closes the socket, and records the disconnect.
    ///
    /// Idempotent; exactly one caller performs the teardown no matter how
    /// many triggers race.
    ///
    /// The future is boxed: teardown re-enters the send path through the
    /// roster broadcast, and the indirection keeps the future type finite.
    pub fn disconnect(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            let _ = self.shutdown.send(());

            let room = self.room.lock().await.clone();
            if let Some(room) = room {
                room.leave(self).await;
            }
            self.relay.remove_session(self.id).await;

            {
                let mut writer = self.writer.lock().await;
                let _ = writer.shutdown().await;
            }

            self.relay.stats().record_disconnect();
            info!("[{}] disconnected", self.id);
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
