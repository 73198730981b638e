//! Rooms: named groups of sessions that exchange broadcasts.
//!
//! A room owns an ordered member list and an ordered list of members with
//! outstanding save-state requests. Both are mutated by many concurrent
//! session tasks, so every operation takes the collection's lock, and
//! broadcast fan-out iterates a snapshot taken under that lock. Delivery to
//! each member is an independent spawned task: one slow or dead peer never
//! blocks the rest of the room.

use crate::protocol::Packet;
use crate::relay::Relay;
use crate::session::{Session, SessionId};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A named group of member sessions.
///
/// Invariants: a room with zero members is removed from the registry
/// immediately upon the last member's departure, and a session belongs to
/// at most one room at a time.
pub struct Room {
    /// Arbitrary key supplied by the first client that referenced the room
    id: String,

    /// Registry that owns this room
    relay: Arc<Relay>,

    /// Current members, in join order
    members: Mutex<Vec<Arc<Session>>>,

    /// Members awaiting a save-state push, in request order
    state_requests: Mutex<Vec<Arc<Session>>>,
}

impl Room {
    pub(crate) fn new(id: &str, relay: Arc<Relay>) -> Self {
        Self {
            id: id.to_string(),
            relay,
            members: Mutex::new(Vec::new()),
            state_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    /// A snapshot of the current membership.
    pub async fn members_snapshot(&self) -> Vec<Arc<Session>> {
        self.members.lock().await.clone()
    }

    /// Looks up a member by session id.
    pub async fn find_member(&self, id: SessionId) -> Option<Arc<Session>> {
        self.members
            .lock()
            .await
            .iter()
            .find(|m| m.id() == id)
            .cloned()
    }

    /// Adds a session to the room and broadcasts the updated roster.
    ///
    /// The roster broadcast is how peers learn about each other: there is
    /// no separate discovery protocol.
    pub async fn join(self: &Arc<Self>, session: Arc<Session>) {
        // The room slot lock spans the closed check, the membership insert,
        // and the slot assignment. A session being torn down concurrently
        // must not enter: its disconnect reads the slot after setting the
        // closed flag, so it either sees the membership and removes it, or
        // this check sees the flag and declines. The same lock also makes
        // two racing join requests mutually exclusive, keeping a session in
        // at most one room.
        {
            let mut slot = session.room_slot().lock().await;
            if slot.is_some() || session.is_closed() {
                return;
            }
            info!("[Room {}] adding client {}", self.id, session.id());
            self.members.lock().await.push(session.clone());
            *slot = Some(self.clone());
        }
        self.broadcast_roster().await;
    }

    /// Removes a session from the room.
    ///
    /// Remaining members receive an updated roster so they learn of the
    /// departure; if nobody remains, the room removes itself from the
    /// registry.
    pub async fn leave(&self, session: &Session) {
        info!("[Room {}] removing client {}", self.id, session.id());

        let remaining = {
            let mut members = self.members.lock().await;
            if let Some(pos) = members.iter().position(|m| m.id() == session.id()) {
                members.remove(pos);
            }
            members.len()
        };
        self.state_requests
            .lock()
            .await
            .retain(|m| m.id() != session.id());
        session.clear_room().await;

        if remaining > 0 {
            self.broadcast_roster().await;
        } else {
            info!("[Room {}] no clients left, removing room", self.id);
            self.relay.remove_room(&self.id).await;
        }
    }

    /// Sends every member an `ALL_CLIENT_DATA` packet listing each *other*
    /// member's identifier and last-known data blob.
    pub async fn broadcast_roster(&self) {
        if !self.relay.quiet_mode() {
            info!("[Room {}] <- ALL_CLIENT_DATA packet", self.id);
        }

        let members = self.members.lock().await.clone();
        for member in &members {
            let mut roster = Vec::new();
            for other in &members {
                if other.id() == member.id() {
                    continue;
                }
                let mut entry = Map::new();
                entry.insert("clientId".to_string(), json!(other.id()));
                for (key, value) in other.data_snapshot().await {
                    entry.insert(key, value);
                }
                roster.push(Value::Object(entry));
            }

            let packet = Packet::all_client_data(&self.id, roster);
            let member = member.clone();
            tokio::spawn(async move {
                member.send_packet(packet).await;
            });
        }
    }

    /// Delivers a packet to every member except the sender.
    pub async fn broadcast(&self, packet: &Packet, sender: SessionId) {
        if !packet.quiet_or(true) && !self.relay.quiet_mode() {
            info!(
                "[Room {}] <- {} packet from {}",
                self.id,
                packet.type_name(),
                sender
            );
        }

        let members = self.members.lock().await.clone();
        for member in members {
            if member.id() == sender {
                continue;
            }
            let packet = packet.clone();
            tokio::spawn(async move {
                member.send_packet(packet).await;
            });
        }
    }

    /// Records a member as awaiting a save-state push.
    pub async fn queue_state_request(&self, session: Arc<Session>) {
        self.state_requests.lock().await.push(session);
    }

    /// Sessions currently awaiting a save-state push.
    pub async fn state_requests_snapshot(&self) -> Vec<Arc<Session>> {
        self.state_requests.lock().await.clone()
    }

    /// Delivers a pushed save state to every pending requester and clears
    /// the queue. Members who never requested a state receive nothing.
    pub async fn fulfill_state_requests(&self, packet: &Packet) {
        let pending = std::mem::take(&mut *self.state_requests.lock().await);
        for requester in pending {
            let packet = packet.clone();
            tokio::spawn(async move {
                requester.send_packet(packet).await;
            });
        }
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room").field("id", &self.id).finish_non_exhaustive()
    }
}
