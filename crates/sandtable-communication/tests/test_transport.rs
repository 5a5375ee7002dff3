use parking_lot::Mutex;
use sandtable_communication::{MessageType, Packet, SerialLink, Transport, TransportConfig};
use sandtable_core::{ConnectionError, Error, ProtocolError, StepCommand};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const CONFIRM: [u8; 3] = [0x61, 0x62, 0x69];
const FAIL: [u8; 3] = [0x61, 0x62, 0x70];
const BUFFER_FULL: [u8; 3] = [0x61, 0x62, 0x73];

type Responder = Box<dyn FnMut(&Packet) -> Vec<u8> + Send>;

// Frames the host wrote and bytes waiting to be read back
#[derive(Default)]
struct Wire {
    writes: Vec<(Instant, Packet)>,
    inbound: VecDeque<u8>,
    flushes: usize,
    unplugged: bool,
}

struct MockLink {
    wire: Arc<Mutex<Wire>>,
    responder: Responder,
}

impl SerialLink for MockLink {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut wire = self.wire.lock();
        if wire.unplugged {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        let packet = Packet::decode(data).expect("host wrote a malformed frame");
        let reply = (self.responder)(&packet);
        wire.inbound.extend(reply);
        wire.writes.push((Instant::now(), packet));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = self.wire.lock();
        let mut n = 0;
        while n < buf.len() {
            match wire.inbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        if n == 0 {
            Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
        } else {
            Ok(n)
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let mut wire = self.wire.lock();
        wire.inbound.clear();
        wire.flushes += 1;
        Ok(())
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}

fn fast_config() -> TransportConfig {
    TransportConfig {
        poll_interval: Duration::from_millis(1),
        backoff: Duration::from_millis(30),
        read_timeout: Duration::from_millis(20),
        settle_delay: Duration::ZERO,
        motion_queue_capacity: 25,
        command_queue_capacity: 25,
        enqueue_timeout: Duration::from_millis(50),
    }
}

fn transport_with(config: TransportConfig, responder: Responder) -> (Transport, Arc<Mutex<Wire>>) {
    let wire = Arc::new(Mutex::new(Wire::default()));
    let link = MockLink {
        wire: wire.clone(),
        responder,
    };
    let transport = Transport::new(Box::new(link), config).unwrap();
    (transport, wire)
}

fn confirm_everything() -> Responder {
    Box::new(|_| CONFIRM.to_vec())
}

fn written(wire: &Arc<Mutex<Wire>>) -> Vec<Packet> {
    wire.lock().writes.iter().map(|(_, p)| p.clone()).collect()
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn pos(r: i32, dphi: i32) -> StepCommand {
    StepCommand::new(r, dphi)
}

#[test]
fn test_positions_delivered_in_order() {
    let (transport, wire) = transport_with(fast_config(), confirm_everything());

    for command in [pos(1, 2), pos(3, 4), pos(5, 6)] {
        transport.send_position(command).unwrap();
    }
    for _ in 0..3 {
        transport.poll_once().unwrap();
    }

    assert_eq!(
        written(&wire),
        vec![
            Packet::position(pos(1, 2)),
            Packet::position(pos(3, 4)),
            Packet::position(pos(5, 6)),
        ]
    );
    assert!(transport.is_idle());
}

#[test]
fn test_rejected_position_is_resent_after_backoff() {
    let mut rejections = 2;
    let (transport, wire) = transport_with(
        fast_config(),
        Box::new(move |packet| {
            if packet.kind() == MessageType::Position && rejections > 0 {
                rejections -= 1;
                FAIL.to_vec()
            } else {
                CONFIRM.to_vec()
            }
        }),
    );

    transport.send_position(pos(100, 0)).unwrap();
    transport.begin().unwrap();
    assert!(wait_until(Duration::from_secs(2), || transport.is_idle()));
    transport.shutdown().unwrap();

    let writes = wire.lock().writes.clone();
    assert_eq!(writes.len(), 3);
    assert!(writes.iter().all(|(_, p)| *p == Packet::position(pos(100, 0))));
    for pair in writes.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= fast_config().backoff);
    }
}

#[test]
fn test_order_survives_rejections() {
    let mut replies = vec![FAIL, BUFFER_FULL].into_iter();
    let (transport, wire) = transport_with(
        fast_config(),
        Box::new(move |_| replies.next().unwrap_or(CONFIRM).to_vec()),
    );

    transport.send_position(pos(1, 0)).unwrap();
    transport.send_position(pos(2, 0)).unwrap();
    transport.begin().unwrap();
    assert!(wait_until(Duration::from_secs(2), || transport.is_idle()));
    transport.shutdown().unwrap();

    let order: Vec<i32> = written(&wire)
        .iter()
        .filter_map(Packet::step_command)
        .map(|c| c.r_steps)
        .collect();
    assert_eq!(order, vec![1, 1, 1, 2]);
}

#[test]
fn test_silence_keeps_position_pending() {
    let mut answered = false;
    let (transport, wire) = transport_with(
        fast_config(),
        Box::new(move |_| {
            let reply = if answered { CONFIRM.to_vec() } else { Vec::new() };
            answered = true;
            reply
        }),
    );

    transport.send_position(pos(7, 7)).unwrap();
    transport.poll_once().unwrap();
    assert!(transport.awaiting_ack());
    assert_eq!(transport.motion_queue_len(), 0);

    // Timeouts do not start a backoff, so the next pass resends at once
    transport.poll_once().unwrap();
    assert!(!transport.awaiting_ack());
    assert_eq!(written(&wire).len(), 2);
}

#[test]
fn test_unexpected_response_drops_position() {
    let mut first = true;
    let (transport, wire) = transport_with(
        fast_config(),
        Box::new(move |_| {
            let reply = if first { vec![0x61, 0x62, 0x42] } else { CONFIRM.to_vec() };
            first = false;
            reply
        }),
    );

    transport.send_position(pos(1, 1)).unwrap();
    transport.send_position(pos(2, 2)).unwrap();
    transport.poll_once().unwrap();
    assert!(!transport.awaiting_ack());
    transport.poll_once().unwrap();

    assert_eq!(
        written(&wire),
        vec![Packet::position(pos(1, 1)), Packet::position(pos(2, 2))]
    );
}

#[test]
fn test_motion_lane_served_before_commands() {
    let (transport, wire) = transport_with(fast_config(), confirm_everything());

    transport.home().unwrap();
    transport.send_position(pos(10, 0)).unwrap();
    transport.poll_once().unwrap();

    let kinds: Vec<MessageType> = written(&wire).iter().map(Packet::kind).collect();
    assert_eq!(kinds, vec![MessageType::Position, MessageType::Home]);
}

#[test]
fn test_commands_are_sent_once() {
    let (transport, wire) = transport_with(fast_config(), Box::new(|_| FAIL.to_vec()));

    transport.start().unwrap();
    transport.stop(true).unwrap();
    assert_eq!(transport.command_queue_len(), 3);
    for _ in 0..5 {
        transport.poll_once().unwrap();
    }

    let kinds: Vec<MessageType> = written(&wire).iter().map(Packet::kind).collect();
    assert_eq!(
        kinds,
        vec![MessageType::Start, MessageType::Stop, MessageType::Clear]
    );
}

#[test]
fn test_buffer_size_reply_is_recorded() {
    let (transport, _wire) = transport_with(
        fast_config(),
        Box::new(|packet| match packet.kind() {
            MessageType::GetBufferSize => vec![0x61, 0x62, 0x72, 17],
            _ => CONFIRM.to_vec(),
        }),
    );

    assert_eq!(transport.reported_buffer_size(), None);
    transport.request_buffer_size().unwrap();
    transport.poll_once().unwrap();
    assert_eq!(transport.reported_buffer_size(), Some(17));
}

#[test]
fn test_invalid_frames_are_never_queued() {
    let (transport, wire) = transport_with(fast_config(), confirm_everything());

    let err = transport.update_speed(70000).unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::SpeedOutOfRange { value: 70000 })
    ));
    assert!(transport.send_position_values(&[1, 2, 3]).unwrap_err().is_protocol_error());
    assert!(transport.send_position_values(&[i64::MAX, 0]).is_err());
    assert_eq!(transport.command_queue_len(), 0);
    assert_eq!(transport.motion_queue_len(), 0);

    transport.update_speed(1000).unwrap();
    transport.poll_once().unwrap();
    assert_eq!(written(&wire)[0].speed_value(), Some(1000));
}

#[test]
fn test_full_lane_times_out() {
    let config = TransportConfig {
        motion_queue_capacity: 2,
        ..fast_config()
    };
    let (transport, _wire) = transport_with(config, confirm_everything());

    transport.send_position(pos(1, 0)).unwrap();
    transport.send_position(pos(2, 0)).unwrap();

    let start = Instant::now();
    let err = transport.send_position(pos(3, 0)).unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(transport.motion_queue_len(), 2);
}

#[test]
fn test_lifecycle_guards() {
    let (transport, _wire) = transport_with(fast_config(), confirm_everything());

    assert!(!transport.is_running());
    transport.shutdown().unwrap();

    transport.begin().unwrap();
    assert!(transport.is_running());
    assert!(matches!(
        transport.begin(),
        Err(Error::Connection(ConnectionError::AlreadyRunning))
    ));
    assert!(transport.poll_once().is_err());

    transport.shutdown().unwrap();
    transport.shutdown().unwrap();
    assert!(!transport.is_running());

    // The link is handed back and can be driven again
    transport.send_position(pos(1, 1)).unwrap();
    transport.poll_once().unwrap();
    assert!(transport.is_idle());
}

#[test]
fn test_write_failure_faults_transport() {
    let (transport, wire) = transport_with(fast_config(), confirm_everything());
    wire.lock().unplugged = true;

    transport.send_position(pos(1, 1)).unwrap();
    transport.begin().unwrap();
    assert!(wait_until(Duration::from_secs(2), || transport.is_faulted()));
    assert!(wait_until(Duration::from_secs(2), || !transport.is_running()));

    assert!(matches!(
        transport.send_position(pos(2, 2)),
        Err(Error::Connection(ConnectionError::LinkLost { .. }))
    ));
    transport.shutdown().unwrap();
    assert!(transport.begin().is_err());
}

#[test]
fn test_open_flushes_stale_input() {
    let wire = Arc::new(Mutex::new(Wire::default()));
    wire.lock().inbound.extend(CONFIRM);
    let link = MockLink {
        wire: wire.clone(),
        responder: confirm_everything(),
    };

    let _transport = Transport::new(Box::new(link), fast_config()).unwrap();
    assert_eq!(wire.lock().flushes, 1);
    assert!(wire.lock().inbound.is_empty());
}
