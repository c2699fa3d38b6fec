//! Consumer-facing protocol.
//!
//! - [`crc`]: CRC-16 variants
//! - [`messages`]: Header and body types
//! - [`packet`]: STX/JSON/CRC/ETX codec
//! - [`session`]: Sensor-to-consumer state machine
//! - [`listener`]: Background reader feeding the inbound queue

pub mod crc;
pub mod listener;
pub mod messages;
pub mod packet;
pub mod session;

pub use self::crc::{Crc16Fn, Crc16Variant};
pub use listener::InboundListener;
pub use messages::{Body, Header, Message};
pub use packet::{CodecError, DecodedPacket, MessageCodec};
pub use session::{InboundOutcome, ProtocolSession, ProtocolSettings, SessionStats};
