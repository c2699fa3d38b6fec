//! Packet envelope and integrity check
//!
//! ```text
//! ┌──────┬──────────────────────────┬────────────────────┬──────┐
//! │ STX  │ Message (compact JSON)   │ CRC-16 (4 hex chr) │ ETX  │
//! │ 0x02 │ variable                 │ uppercase, ASCII   │ 0x03 │
//! └──────┴──────────────────────────┴────────────────────┴──────┘
//! ```
//!
//! The CRC covers the message bytes only. Decoding is lenient: STX/ETX are
//! optional (both or neither), and a CRC mismatch is reported instead of
//! raised so the caller decides what silence means.

use super::crc::Crc16Fn;
use super::messages::Message;

/// Start of packet
pub const STX: u8 = 0x02;
/// End of packet
pub const ETX: u8 = 0x03;
/// Length of the hex CRC field
pub const CRC_FIELD_LEN: usize = 4;

/// Codec failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// No usable message could be parsed from the packet
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Message parsed but the checksum does not match
    #[error("CRC mismatch: computed {computed:04X}, received {}", fmt_crc(.received))]
    CrcMismatch {
        computed: u16,
        /// `None` when the CRC field is missing or not hex
        received: Option<u16>,
    },
}

fn fmt_crc(crc: &Option<u16>) -> String {
    crc.map_or_else(|| "none".to_string(), |c| format!("{:04X}", c))
}

/// Outcome of decoding one packet
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    /// Parsed message, or why it could not be parsed
    pub message: Result<Message, CodecError>,
    /// CRC parsed from the packet, if present and valid hex
    pub received_crc: Option<u16>,
    /// CRC recomputed over the message bytes
    pub computed_crc: u16,
    /// True when both CRCs are present and equal
    pub crc_ok: bool,
}

impl DecodedPacket {
    /// Collapse into a message that is both parsed and verified
    pub fn into_verified(self) -> Result<Message, CodecError> {
        let message = self.message?;
        if self.crc_ok {
            Ok(message)
        } else {
            Err(CodecError::CrcMismatch {
                computed: self.computed_crc,
                received: self.received_crc,
            })
        }
    }
}

/// Encodes messages into packets and validates received packets
#[derive(Clone, Copy)]
pub struct MessageCodec {
    crc16: Crc16Fn,
}

impl MessageCodec {
    pub fn new(crc16: Crc16Fn) -> Self {
        Self { crc16 }
    }

    /// Serialize, checksum and frame a message
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let body = serde_json::to_vec(message).map_err(|e| CodecError::Malformed(e.to_string()))?;
        let crc = (self.crc16)(&body);

        let mut packet = Vec::with_capacity(body.len() + CRC_FIELD_LEN + 2);
        packet.push(STX);
        packet.extend_from_slice(&body);
        packet.extend_from_slice(format!("{:04X}", crc).as_bytes());
        packet.push(ETX);
        Ok(packet)
    }

    /// Split, parse and verify a received packet. Never panics.
    pub fn decode(&self, raw: &[u8]) -> DecodedPacket {
        let core = strip_envelope(raw);

        let (body, crc_field) = if core.len() > CRC_FIELD_LEN {
            core.split_at(core.len() - CRC_FIELD_LEN)
        } else {
            (core, &[][..])
        };

        let received_crc = parse_crc_field(crc_field);
        let computed_crc = (self.crc16)(body);
        let message = parse_message(body);

        DecodedPacket {
            message,
            received_crc,
            computed_crc,
            crc_ok: received_crc == Some(computed_crc),
        }
    }
}

/// Remove STX/ETX when both are present; otherwise take the input as is
fn strip_envelope(raw: &[u8]) -> &[u8] {
    match raw {
        [STX, inner @ .., ETX] => inner,
        _ => raw,
    }
}

/// Parse exactly four hex characters, either case
fn parse_crc_field(field: &[u8]) -> Option<u16> {
    if field.len() != CRC_FIELD_LEN {
        return None;
    }
    let mut bytes = [0u8; 2];
    hex::decode_to_slice(field, &mut bytes).ok()?;
    Some(u16::from_be_bytes(bytes))
}

/// Any JSON is a message; only empty, non-UTF-8 or non-JSON bodies fail
fn parse_message(body: &[u8]) -> Result<Message, CodecError> {
    if body.is_empty() {
        return Err(CodecError::Malformed("empty message".to_string()));
    }
    let text = std::str::from_utf8(body)
        .map_err(|e| CodecError::Malformed(format!("not UTF-8: {}", e)))?;
    serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))
}
