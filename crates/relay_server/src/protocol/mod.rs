//! Wire protocol: packet representation and stream framing.
//!
//! Packets travel as UTF-8 JSON objects, each terminated by a single zero
//! byte. JSON text never contains a raw NUL, so the terminator is
//! unambiguous and no length prefix is needed.

pub use framer::{encode, Framer};
pub use packet::{Packet, PacketKind, DEFAULT_DISCONNECT_MESSAGE};

mod framer;
mod packet;
