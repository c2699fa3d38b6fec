//! Message types exchanged with the downstream consumer.
//!
//! Every message is a JSON object with a `header` and a `data` body. The
//! header's `msg` code selects the body shape:
//!
//! | `msg` | Body | Direction |
//! |-------|------|-----------|
//! | 7 | [`ZoneEventBody`]: `status` + `direction` array | outbound |
//! | 5 | [`AckBody`]: `status` | outbound (reply) |
//! | other | opaque JSON value | inbound |
//!
//! Example zone event (compact form, as sent on the wire):
//!
//! ```text
//! {"header":{"sender":116,"receiver":100,"datetime":"20250101120000123","msg":7,"seq":10},
//!  "data":{"status":1,"direction":[1,1,0,"0000000000010000","0000000000000000"]}}
//! ```

use crate::core::types::Occupancy;
use serde::{Deserialize, Serialize};

/// Message type code for a zone event
pub const MSG_ZONE_EVENT: u32 = 7;
/// Message type code for an acknowledgement
pub const MSG_ACKNOWLEDGEMENT: u32 = 5;

/// `status` value for a normal message
pub const STATUS_OK: u8 = 1;

/// `direction[0]`: something entered the zone
pub const DETECT_PRESENCE: u8 = 1;
/// `direction[0]`: the zone emptied
pub const DETECT_LEAVE: u8 = 2;
/// `direction[1]`: forward travel
pub const HEADING_FORWARD: u8 = 1;

/// Width of the detector flag strings
pub const FLAG_WIDTH: usize = 16;
/// Flag position of the lidar detector unless a zone overrides it
pub const DEFAULT_DETECTOR_SLOT: usize = 11;

/// Local timestamp in the `YYYYMMDDHHMMSSmmm` form used by the header
pub fn header_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// Message header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub sender: u32,
    pub receiver: u32,
    /// `YYYYMMDDHHMMSSmmm`
    pub datetime: String,
    /// Message type code
    pub msg: u32,
    pub seq: u32,
}

/// Direction array of a zone event:
/// `[detect, heading, reserved, detector_flags, aux_flags]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DirectionTuple", into = "DirectionTuple")]
pub struct Direction {
    pub detect: u8,
    pub heading: u8,
    pub reserved: u8,
    /// One `0`/`1` character per detector
    pub detector_flags: String,
    pub aux_flags: String,
}

type DirectionTuple = (u8, u8, u8, String, String);

impl From<DirectionTuple> for Direction {
    fn from((detect, heading, reserved, detector_flags, aux_flags): DirectionTuple) -> Self {
        Self {
            detect,
            heading,
            reserved,
            detector_flags,
            aux_flags,
        }
    }
}

impl From<Direction> for DirectionTuple {
    fn from(d: Direction) -> Self {
        (d.detect, d.heading, d.reserved, d.detector_flags, d.aux_flags)
    }
}

impl Direction {
    /// Direction array announcing `state`, with the armed flag at `detector_slot`
    pub fn for_state(state: Occupancy, detector_slot: usize) -> Self {
        let (detect, armed) = match state {
            Occupancy::Presence => (DETECT_PRESENCE, true),
            Occupancy::Leave => (DETECT_LEAVE, false),
        };
        Self {
            detect,
            heading: HEADING_FORWARD,
            reserved: 0,
            detector_flags: flag_string(detector_slot, armed),
            aux_flags: "0".repeat(FLAG_WIDTH),
        }
    }

    /// Occupancy encoded by the detect code, if it is a known one
    pub fn occupancy(&self) -> Option<Occupancy> {
        match self.detect {
            DETECT_PRESENCE => Some(Occupancy::Presence),
            DETECT_LEAVE => Some(Occupancy::Leave),
            _ => None,
        }
    }
}

/// `FLAG_WIDTH` zeros with a `1` at `slot` when `armed`.
///
/// Out-of-range slots leave every flag at zero.
fn flag_string(slot: usize, armed: bool) -> String {
    (0..FLAG_WIDTH)
        .map(|i| if armed && i == slot { '1' } else { '0' })
        .collect()
}

/// Body of a zone event (msg 7)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEventBody {
    pub status: u8,
    pub direction: Direction,
}

/// Body of an acknowledgement (msg 5)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckBody {
    pub status: u8,
}

/// Message body, selected by `header.msg`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    ZoneEvent(ZoneEventBody),
    Acknowledgement(AckBody),
    /// Any other message type, or a known type whose body has another shape
    Other(serde_json::Value),
}

/// Structured protocol message.
///
/// The header's type code always agrees with the body: the constructors set
/// it, and parsing only produces a typed body when the data fits that type.
/// Parsing accepts any JSON, so inbound packets are never rejected for
/// their content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct Message {
    header: Header,
    #[serde(rename = "data")]
    body: Body,
}

impl From<serde_json::Value> for Message {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(mut map) => {
                let header = map.remove("header").map(lenient_header).unwrap_or_default();
                let data = map.remove("data").unwrap_or(serde_json::Value::Null);
                Message::from_parts(header, data)
            }
            other => Message::from_parts(Header::default(), other),
        }
    }
}

/// Header fields that parse, defaults for the rest.
///
/// Numbers may arrive as strings and the timestamp as a number.
fn lenient_header(value: serde_json::Value) -> Header {
    let field = |key: &str| value.get(key);
    let number = |key: &str| -> u32 {
        match field(key) {
            Some(serde_json::Value::Number(n)) => {
                n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0)
            }
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    };
    let datetime = match field("datetime") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    Header {
        sender: number("sender"),
        receiver: number("receiver"),
        datetime,
        msg: number("msg"),
        seq: number("seq"),
    }
}

impl Message {
    /// Zone event announcing `state`; `header.msg` is set to 7
    pub fn zone_event(mut header: Header, state: Occupancy, detector_slot: usize) -> Self {
        header.msg = MSG_ZONE_EVENT;
        Self {
            header,
            body: Body::ZoneEvent(ZoneEventBody {
                status: STATUS_OK,
                direction: Direction::for_state(state, detector_slot),
            }),
        }
    }

    /// Acknowledgement with `status = 1`; `header.msg` is set to 5
    pub fn acknowledgement(mut header: Header) -> Self {
        header.msg = MSG_ACKNOWLEDGEMENT;
        Self {
            header,
            body: Body::Acknowledgement(AckBody { status: STATUS_OK }),
        }
    }

    /// Resolve `data` against the header's type code.
    ///
    /// Data that does not fit the typed body is kept as [`Body::Other`].
    pub fn from_parts(header: Header, data: serde_json::Value) -> Self {
        let body = match header.msg {
            MSG_ZONE_EVENT => serde_json::from_value(data.clone())
                .map(Body::ZoneEvent)
                .unwrap_or_else(|_| Body::Other(data)),
            MSG_ACKNOWLEDGEMENT => serde_json::from_value(data.clone())
                .map(Body::Acknowledgement)
                .unwrap_or_else(|_| Body::Other(data)),
            _ => Body::Other(data),
        };
        Self { header, body }
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Message type code from the header
    #[inline]
    pub fn kind(&self) -> u32 {
        self.header.msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(msg: u32) -> Header {
        Header {
            sender: 116,
            receiver: 100,
            datetime: "20250101120000123".to_string(),
            msg,
            seq: 10,
        }
    }

    #[test]
    fn test_zone_event_compact_json() {
        let msg = Message::zone_event(header(MSG_ZONE_EVENT), Occupancy::Presence, DEFAULT_DETECTOR_SLOT);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"header":{"sender":116,"receiver":100,"datetime":"20250101120000123","msg":7,"seq":10},"data":{"status":1,"direction":[1,1,0,"0000000000010000","0000000000000000"]}}"#
        );
    }

    #[test]
    fn test_leave_clears_detector_flag() {
        let direction = Direction::for_state(Occupancy::Leave, DEFAULT_DETECTOR_SLOT);
        assert_eq!(direction.detect, DETECT_LEAVE);
        assert_eq!(direction.detector_flags, "0000000000000000");
        assert_eq!(direction.occupancy(), Some(Occupancy::Leave));
    }

    #[test]
    fn test_acknowledgement_json() {
        let msg = Message::acknowledgement(header(MSG_ACKNOWLEDGEMENT));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.ends_with(r#""msg":5,"seq":10},"data":{"status":1}}"#));
    }

    #[test]
    fn test_body_selected_by_type_code() {
        let ack: Message = serde_json::from_str(
            r#"{"header":{"sender":100,"receiver":116,"datetime":"x","msg":5,"seq":1},"data":{"status":1}}"#,
        )
        .unwrap();
        assert!(matches!(ack.body(), Body::Acknowledgement(AckBody { status: 1 })));

        let other: Message = serde_json::from_str(
            r#"{"header":{"sender":100,"receiver":116,"datetime":"x","msg":3,"seq":1},"data":{"mode":"reset"}}"#,
        )
        .unwrap();
        assert_eq!(other.kind(), 3);
        assert!(matches!(other.body(), Body::Other(_)));
    }

    #[test]
    fn test_mismatched_body_kept_as_other() {
        // msg 7 without a direction array is still a message
        let msg: Message = serde_json::from_str(
            r#"{"header":{"sender":1,"receiver":2,"datetime":"x","msg":7,"seq":1},"data":{"status":1}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), MSG_ZONE_EVENT);
        assert_eq!(msg.body(), &Body::Other(serde_json::json!({"status": 1})));
    }

    #[test]
    fn test_loose_header_fields() {
        let msg: Message = serde_json::from_str(
            r#"{"header":{"sender":"100","datetime":20250101120000123,"msg":5,"seq":4},"data":{"status":1}}"#,
        )
        .unwrap();
        assert_eq!(msg.header().sender, 100);
        assert_eq!(msg.header().receiver, 0);
        assert_eq!(msg.header().datetime, "20250101120000123");
        assert!(matches!(msg.body(), Body::Acknowledgement(_)));

        let no_header: Message = serde_json::from_str(r#"{"data":{"status":1}}"#).unwrap();
        assert_eq!(no_header.header(), &Header::default());

        let scalar: Message = serde_json::from_str("42").unwrap();
        assert_eq!(scalar.body(), &Body::Other(serde_json::json!(42)));

        assert!(serde_json::from_str::<Message>("{not json").is_err());
    }

    #[test]
    fn test_constructors_set_type_code() {
        // The code passed in is overridden so header and body always agree
        let event = Message::zone_event(header(MSG_ACKNOWLEDGEMENT), Occupancy::Leave, 2);
        assert_eq!(event.kind(), MSG_ZONE_EVENT);
        let ack = Message::acknowledgement(header(MSG_ZONE_EVENT));
        assert_eq!(ack.kind(), MSG_ACKNOWLEDGEMENT);

        for message in [
            event,
            ack,
            Message::from_parts(header(MSG_ZONE_EVENT), serde_json::json!({"status": 1})),
            Message::from_parts(header(3), serde_json::json!({"mode": "reset"})),
        ] {
            let json = serde_json::to_string(&message).unwrap();
            assert_eq!(serde_json::from_str::<Message>(&json).unwrap(), message);
        }
    }

    #[test]
    fn test_header_timestamp_shape() {
        let ts = header_timestamp();
        assert_eq!(ts.len(), 17);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }
}
