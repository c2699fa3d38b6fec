//! Consumer link tests
//!
//! Inbound handling through the session, the listener thread over a real
//! loopback socket, and one end-to-end daemon run against a fake sensor.
//!
//! Run with: `cargo test --test consumer_link`

mod common;

use common::{occupied_frame, scenario_config};
use drishti::app::DetectorApp;
use drishti::streaming::crc::crc16_modbus;
use drishti::streaming::messages::{Header, MSG_ACKNOWLEDGEMENT, MSG_ZONE_EVENT};
use drishti::streaming::packet::ETX;
use drishti::streaming::{InboundListener, InboundOutcome, Message, MessageCodec, ProtocolSession};
use drishti::transport::MockTransport;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const START_COMMAND: [u8; 2] = [0xA5, 0x20];

fn codec() -> MessageCodec {
    MessageCodec::new(crc16_modbus)
}

fn consumer_command(msg: u32) -> Vec<u8> {
    codec()
        .encode(&Message::from_parts(
            Header {
                sender: 100,
                receiver: 116,
                datetime: "20251017093015042".to_string(),
                msg,
                seq: 3,
            },
            serde_json::json!({"status": 1}),
        ))
        .unwrap()
}

/// Read one STX..ETX packet from a blocking stream
fn read_packet(stream: &mut TcpStream) -> Vec<u8> {
    let mut packet = Vec::new();
    let mut byte = [0u8; 1];
    while packet.last() != Some(&ETX) {
        stream.read_exact(&mut byte).unwrap();
        packet.push(byte[0]);
    }
    packet
}

// ============================================================================
// Inbound Handling
// ============================================================================

#[test]
fn test_verified_command_is_acked_then_sensor_rearmed() {
    let sensor = MockTransport::new();
    let consumer = MockTransport::new();
    let mut session =
        ProtocolSession::from_config(&scenario_config(), sensor.clone(), consumer.clone()).unwrap();

    session.arm_sensor().unwrap();
    assert_eq!(sensor.get_written(), START_COMMAND.to_vec());
    sensor.clear_written();

    let outcome = session.handle_inbound(&consumer_command(9)).unwrap();
    assert_eq!(outcome, InboundOutcome::Acknowledged { kind: 9 });

    let writes = consumer.writes();
    assert_eq!(writes.len(), 1);
    let ack = codec().decode(&writes[0]).into_verified().unwrap();
    assert_eq!(ack.kind(), MSG_ACKNOWLEDGEMENT);
    assert_eq!(sensor.get_written(), START_COMMAND.to_vec());

    // A consumer packet carrying the zone-event type code is still just a command
    sensor.clear_written();
    let outcome = session.handle_inbound(&consumer_command(MSG_ZONE_EVENT)).unwrap();
    assert_eq!(outcome, InboundOutcome::Acknowledged { kind: MSG_ZONE_EVENT });
    assert_eq!(consumer.writes().len(), 2);
    assert_eq!(sensor.get_written(), START_COMMAND.to_vec());
}

#[test]
fn test_corrupted_or_garbage_input_is_silent() {
    let sensor = MockTransport::new();
    let consumer = MockTransport::new();
    let mut session =
        ProtocolSession::from_config(&scenario_config(), sensor.clone(), consumer.clone()).unwrap();

    let mut corrupted = consumer_command(9);
    corrupted[10] ^= 0x20;
    assert!(matches!(
        session.handle_inbound(&corrupted).unwrap(),
        InboundOutcome::Rejected { .. } | InboundOutcome::Discarded(_)
    ));
    assert!(matches!(
        session.handle_inbound(b"abc").unwrap(),
        InboundOutcome::Discarded(_)
    ));

    assert!(consumer.writes().is_empty());
    assert!(sensor.get_written().is_empty());
}

// ============================================================================
// Listener Thread
// ============================================================================

#[test]
fn test_listener_forwards_packets_and_ends_on_close() {
    let server = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    let (stream, _) = server.accept().unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();

    let (tx, rx) = crossbeam_channel::unbounded();
    let running = Arc::new(AtomicBool::new(true));
    let handle = InboundListener::new(stream, tx, Arc::clone(&running))
        .spawn()
        .unwrap();

    let packet = consumer_command(5);
    client.write_all(&packet).unwrap();
    let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(received, packet);

    drop(client);
    handle.join().unwrap();
    assert!(matches!(
        rx.recv_timeout(Duration::from_secs(1)),
        Err(crossbeam_channel::RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn test_listener_observes_shutdown_flag() {
    let server = TcpListener::bind("127.0.0.1:0").unwrap();
    let _client = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    let (stream, _) = server.accept().unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(50)))
        .unwrap();

    let (tx, _rx) = crossbeam_channel::unbounded();
    let running = Arc::new(AtomicBool::new(true));
    let handle = InboundListener::new(stream, tx, Arc::clone(&running))
        .spawn()
        .unwrap();

    running.store(false, Ordering::Relaxed);
    let started = Instant::now();
    handle.join().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

// ============================================================================
// End to End
// ============================================================================

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn connect_with_retry(addr: &str) -> TcpStream {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => return stream,
            Err(_) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
            Err(e) => panic!("could not connect to {}: {}", addr, e),
        }
    }
}

#[test]
fn test_daemon_reports_zone_event_and_acknowledges() {
    let sensor_server = TcpListener::bind("127.0.0.1:0").unwrap();
    let bind_address = format!("127.0.0.1:{}", free_port());

    let mut config = scenario_config();
    config.sensor.address = sensor_server.local_addr().unwrap().to_string();
    config.server.bind_address = bind_address.clone();
    config.radar.update_ms = 10;
    config.protocol.queue_drain_ms = 10;
    config.debounce.frame_on = 1;
    config.logging.stats_interval_s = 0;

    let running = Arc::new(AtomicBool::new(true));
    let app_running = Arc::clone(&running);
    let daemon = thread::spawn(move || DetectorApp::new(config, app_running).run());

    let (mut sensor, _) = sensor_server.accept().unwrap();
    sensor
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut consumer = connect_with_retry(&bind_address);
    consumer
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    // Armed once the consumer is attached
    let mut command = [0u8; 2];
    sensor.read_exact(&mut command).unwrap();
    assert_eq!(command, START_COMMAND);

    sensor.write_all(&occupied_frame()).unwrap();
    let event = codec()
        .decode(&read_packet(&mut consumer))
        .into_verified()
        .unwrap();
    assert_eq!(event.kind(), MSG_ZONE_EVENT);

    consumer.write_all(&consumer_command(3)).unwrap();
    let ack = codec()
        .decode(&read_packet(&mut consumer))
        .into_verified()
        .unwrap();
    assert_eq!(ack.kind(), MSG_ACKNOWLEDGEMENT);

    sensor.read_exact(&mut command).unwrap();
    assert_eq!(command, START_COMMAND);

    running.store(false, Ordering::Relaxed);
    daemon.join().unwrap().unwrap();
}
