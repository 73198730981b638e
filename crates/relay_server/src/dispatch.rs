//! Per-packet dispatch logic.
//!
//! Every decoded inbound packet is annotated with its sender's identifier
//! and then routed, in order: room join, unicast, then type-specific
//! handling. Each call runs as its own spawned task, so dispatch never
//! blocks the originating connection's read loop.

use crate::protocol::{Packet, PacketKind};
use crate::session::Session;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routes one inbound packet from `session`.
///
/// Handling order:
/// 1. `UPDATE_CLIENT_DATA` replaces the session's stored data blob.
/// 2. A `roomId` field joins the session to that room (created on demand)
///    if it is not already in one.
/// 3. Without a room, the packet is dropped.
/// 4. A `targetClientId` field unicasts the packet to that member only.
/// 5. Otherwise the `type` discriminator decides: completion counting,
///    save-state queuing/fulfillment, or a plain room broadcast.
pub(crate) async fn handle_packet(session: Arc<Session>, mut packet: Packet) {
    if session.is_closed() {
        return;
    }
    packet.set_client_id(session.id());
    let relay = session.relay().clone();

    if !packet.quiet_or(false) && !relay.quiet_mode() {
        info!("[{}] -> {} packet", session.id(), packet.type_name());
    }

    if packet.kind() == PacketKind::UpdateClientData {
        if let Some(data) = packet.data_object() {
            session.set_data(data.clone()).await;
        }
    }

    if let Some(room_id) = packet.room_id() {
        if session.room().await.is_none() {
            let room = relay.get_or_create_room(room_id).await;
            room.join(session.clone()).await;
        }
    }

    let Some(room) = session.room().await else {
        debug!("[{}] not in a room, ignoring packet", session.id());
        return;
    };

    if packet.has_target() {
        let Some(target) = packet.normalize_target() else {
            warn!("[{}] non-numeric targetClientId, dropping packet", session.id());
            return;
        };
        match room.find_member(target).await {
            Some(member) => {
                tokio::spawn(async move {
                    member.send_packet(packet).await;
                });
            }
            None => warn!("[{}] target client {target} not found", session.id()),
        }
        return;
    }

    match packet.kind() {
        PacketKind::GameComplete => relay.stats().record_game_complete(),
        PacketKind::RequestSaveState => {
            if room.member_count().await > 1 {
                room.queue_state_request(session.clone()).await;
            }
            room.broadcast(&packet, session.id()).await;
        }
        PacketKind::PushSaveState => room.fulfill_state_requests(&packet).await,
        _ => room.broadcast(&packet, session.id()).await,
    }
}
