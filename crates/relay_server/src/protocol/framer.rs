//! NUL-delimited JSON framing over a byte stream.
//!
//! TCP delivers bytes, not messages: a single read may contain a fraction
//! of one packet or several coalesced packets. The framer carries the
//! unterminated tail between reads and emits every complete frame it can,
//! in stream order.

use crate::error::ProtocolError;
use crate::protocol::Packet;
use tracing::warn;

/// The frame terminator. JSON text encoding never emits a raw NUL, so the
/// byte cannot appear inside a valid frame.
const DELIMITER: u8 = 0;

/// Serializes a packet to its wire form: JSON text plus the terminator.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(packet).map_err(ProtocolError::Encode)?;
    bytes.push(DELIMITER);
    Ok(bytes)
}

/// Incremental decoder for one connection's inbound byte stream.
///
/// Feed it whatever each read produced; it returns the packets completed by
/// that read and buffers any trailing partial frame for the next call. A
/// frame that fails to parse is reported and skipped without disturbing the
/// rest of the stream.
#[derive(Debug, Default)]
pub struct Framer {
    buf: Vec<u8>,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` to the carry-over buffer and decodes every complete
    /// frame now available, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Packet> {
        self.buf.extend_from_slice(bytes);

        let mut packets = Vec::new();
        while let Some(end) = self.buf.iter().position(|&b| b == DELIMITER) {
            let segment: Vec<u8> = self.buf.drain(..=end).collect();
            match serde_json::from_slice::<Packet>(&segment[..end]) {
                Ok(packet) => packets.push(packet),
                Err(e) => warn!("Unable to parse packet segment, skipping: {e}"),
            }
        }
        packets
    }

    /// Bytes of the unterminated trailing frame carried to the next read.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}
