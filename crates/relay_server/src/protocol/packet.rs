//! Packet representation and the routing fields the relay recognizes.
//!
//! A packet is an ordered JSON object. The relay reads a small set of
//! well-known keys (`type`, `roomId`, `targetClientId`, `quiet`, `data`)
//! and treats everything else as opaque payload to be forwarded verbatim.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Default text for a server-issued disconnect notice when the operator
/// did not supply one.
pub const DEFAULT_DISCONNECT_MESSAGE: &str =
    "You have been disconnected by the server.\nTry to connect again in a bit!";

/// The known values of the `type` discriminator.
///
/// Unknown types are carried through in [`PacketKind::Other`] and treated
/// as plain room broadcasts; a packet without a `type` field dispatches as
/// [`PacketKind::Untyped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketKind {
    Heartbeat,
    UpdateClientData,
    GameComplete,
    RequestSaveState,
    PushSaveState,
    AllClientData,
    ServerMessage,
    DisableAnchor,
    Other(String),
    Untyped,
}

impl PacketKind {
    fn parse(name: &str) -> Self {
        match name {
            "Heartbeat" => Self::Heartbeat,
            "UPDATE_CLIENT_DATA" => Self::UpdateClientData,
            "GAME_COMPLETE" => Self::GameComplete,
            "REQUEST_SAVE_STATE" => Self::RequestSaveState,
            "PUSH_SAVE_STATE" => Self::PushSaveState,
            "ALL_CLIENT_DATA" => Self::AllClientData,
            "SERVER_MESSAGE" => Self::ServerMessage,
            "DISABLE_ANCHOR" => Self::DisableAnchor,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One application message: an ordered mapping of string keys to arbitrary
/// JSON values.
///
/// Packets are immutable once framed except for the relay's own annotation
/// of the sending session's `clientId` before forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Packet {
    fields: Map<String, Value>,
}

impl Packet {
    /// Wraps an already-built field map.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The `type` discriminator as sent on the wire, or `""` if absent.
    pub fn type_name(&self) -> &str {
        self.fields.get("type").and_then(Value::as_str).unwrap_or("")
    }

    /// The `type` discriminator resolved to a [`PacketKind`].
    pub fn kind(&self) -> PacketKind {
        match self.fields.get("type").and_then(Value::as_str) {
            Some(name) => PacketKind::parse(name),
            None => PacketKind::Untyped,
        }
    }

    /// The `roomId` join key, if present.
    pub fn room_id(&self) -> Option<&str> {
        self.fields.get("roomId").and_then(Value::as_str)
    }

    /// Whether this packet carries a `targetClientId` unicast key.
    pub fn has_target(&self) -> bool {
        self.fields.contains_key("targetClientId")
    }

    /// Normalizes the `targetClientId` wire representation to a session id.
    ///
    /// JSON numbers arrive as either integers or floats depending on the
    /// client's encoder; the field is rewritten as an integer so forwarded
    /// copies carry the canonical form. Returns `None` when the field is
    /// missing or not numeric.
    pub fn normalize_target(&mut self) -> Option<SessionId> {
        let value = self.fields.get("targetClientId")?;
        let target = value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f as u64))? as SessionId;
        self.fields
            .insert("targetClientId".to_string(), json!(target));
        Some(target)
    }

    /// The `quiet` log-suppression flag, with a caller-chosen default for
    /// packets that do not carry it.
    pub fn quiet_or(&self, default: bool) -> bool {
        self.fields
            .get("quiet")
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// The opaque `data` payload, if the packet carries an object there.
    pub fn data_object(&self) -> Option<&Map<String, Value>> {
        self.fields.get("data").and_then(Value::as_object)
    }

    /// Annotates the packet with the sending session's identifier.
    pub fn set_client_id(&mut self, id: SessionId) {
        self.fields.insert("clientId".to_string(), json!(id));
    }

    /// Raw field access, used by tests and the operator console.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Server-originated liveness ping.
    pub fn heartbeat() -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), json!("Heartbeat"));
        Self { fields }
    }

    /// Server-originated free-text notice.
    pub fn server_message(message: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), json!("SERVER_MESSAGE"));
        fields.insert("message".to_string(), json!(message));
        Self { fields }
    }

    /// Instructs the client to disable the synchronization feature.
    pub fn disable_anchor() -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), json!("DISABLE_ANCHOR"));
        Self { fields }
    }

    /// Room roster broadcast: one `{clientId, ...data}` entry per other
    /// member of the room.
    pub fn all_client_data(room_id: &str, clients: Vec<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), json!("ALL_CLIENT_DATA"));
        fields.insert("roomId".to_string(), json!(room_id));
        fields.insert("clients".to_string(), Value::Array(clients));
        Self { fields }
    }
}
