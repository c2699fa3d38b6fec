//! Detection pipeline tests
//!
//! Drives a full session (synchronizer, decoder, zone engine, codec) with
//! synthetic sensor frames over in-memory transports and checks what the
//! consumer receives.
//!
//! Run with: `cargo test --test detection_pipeline`

mod common;

use common::{empty_frame, occupied_frame, scenario_config, sensor_frame};
use drishti::Occupancy;
use drishti::streaming::crc::crc16_modbus;
use drishti::streaming::messages::{Body, DETECT_LEAVE, DETECT_PRESENCE, MSG_ZONE_EVENT};
use drishti::streaming::{Message, MessageCodec, ProtocolSession};
use drishti::transport::MockTransport;

type MockSession = ProtocolSession<MockTransport, MockTransport>;

fn session() -> (MockSession, MockTransport, MockTransport) {
    let sensor = MockTransport::new();
    let consumer = MockTransport::new();
    let session =
        ProtocolSession::from_config(&scenario_config(), sensor.clone(), consumer.clone()).unwrap();
    (session, sensor, consumer)
}

fn sent_messages(consumer: &MockTransport) -> Vec<Message> {
    let codec = MessageCodec::new(crc16_modbus);
    consumer
        .writes()
        .iter()
        .map(|packet| codec.decode(packet).into_verified().unwrap())
        .collect()
}

// ============================================================================
// Reference Scenario
// ============================================================================

#[test]
fn test_presence_then_leave_on_fifth_frame() {
    let (mut session, _, consumer) = session();

    for frame in 1..=4 {
        let transitions = session.ingest(&occupied_frame()).unwrap();
        assert!(transitions.is_empty(), "early transition on frame {}", frame);
    }
    let transitions = session.ingest(&occupied_frame()).unwrap();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].zone_index, 0);
    assert_eq!(transitions[0].state, Occupancy::Presence);

    for frame in 1..=4 {
        let transitions = session.ingest(&empty_frame()).unwrap();
        assert!(transitions.is_empty(), "early leave on frame {}", frame);
    }
    let transitions = session.ingest(&empty_frame()).unwrap();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].state, Occupancy::Leave);

    let sent = sent_messages(&consumer);
    assert_eq!(sent.len(), 2);

    let expected = [
        (DETECT_PRESENCE, "0000000000010000"),
        (DETECT_LEAVE, "0000000000000000"),
    ];
    for (message, (detect, flags)) in sent.iter().zip(expected) {
        assert_eq!(message.kind(), MSG_ZONE_EVENT);
        assert_eq!(message.header().sender, 116);
        assert_eq!(message.header().receiver, 100);
        assert_eq!(message.header().datetime.len(), 17);
        match message.body() {
            Body::ZoneEvent(body) => {
                assert_eq!(body.status, 1);
                assert_eq!(body.direction.detect, detect);
                assert_eq!(body.direction.heading, 1);
                assert_eq!(body.direction.reserved, 0);
                assert_eq!(body.direction.detector_flags, flags);
                assert_eq!(body.direction.aux_flags, "0000000000000000");
            }
            other => panic!("expected zone event, got {:?}", other),
        }
    }
    assert!(sent[1].header().seq > sent[0].header().seq);
    assert_eq!(session.stats().frames_decoded, 10);
}

#[test]
fn test_narrow_object_never_triggers() {
    let (mut session, _, consumer) = session();
    // Four close samples: below the run-length gate
    let frame = sensor_frame(|i| if (88..=91).contains(&i) { 1000 } else { 5000 });

    for _ in 0..20 {
        assert!(session.ingest(&frame).unwrap().is_empty());
    }
    assert!(consumer.writes().is_empty());
    assert_eq!(session.zone_states()[0].occupancy(), Occupancy::Leave);
}

#[test]
fn test_flicker_resets_debounce() {
    let (mut session, _, consumer) = session();

    for _ in 0..3 {
        for _ in 0..4 {
            session.ingest(&occupied_frame()).unwrap();
        }
        session.ingest(&empty_frame()).unwrap();
    }
    assert!(consumer.writes().is_empty());
    assert_eq!(session.zone_states()[0].presence_run(), 0);
}

// ============================================================================
// Stream Synchronization Through the Session
// ============================================================================

#[test]
fn test_frames_split_across_reads() {
    let (mut session, sensor, _) = session();
    let frame = occupied_frame();

    // Leading noise, then the frame in uneven chunks
    sensor.inject_read(&[0xFF, 0x02, 0x02, 0x13]);
    assert!(session.poll_sensor().unwrap().is_empty());
    for chunk in frame.chunks(97) {
        sensor.inject_read(chunk);
        session.poll_sensor().unwrap();
    }
    assert_eq!(session.stats().frames_decoded, 1);
    assert_eq!(session.stats().last_min_mm, Some(1000));
    assert_eq!(session.stats().last_max_mm, Some(5000));
}

#[test]
fn test_only_newest_frame_in_a_read_is_used() {
    let (mut session, sensor, _) = session();

    let mut burst = empty_frame();
    burst.extend_from_slice(&occupied_frame());
    sensor.inject_read(&burst);
    session.poll_sensor().unwrap();

    assert_eq!(session.stats().frames_decoded, 1);
    assert_eq!(session.stats().last_min_mm, Some(1000));
    assert_eq!(session.zone_states()[0].presence_run(), 1);
}

#[test]
fn test_far_readings_are_clamped() {
    let (mut session, _, _) = session();
    session.ingest(&sensor_frame(|_| 60_000)).unwrap();
    assert_eq!(session.stats().last_max_mm, Some(10_000));
}
