//! Reliable delivery over the serial link
//!
//! Two bounded queues feed one background loop. Position frames travel the
//! motion lane: one frame is in flight at a time and it is resent until the
//! table confirms it, backing off whenever the table reports a failure or a
//! full buffer. Every other frame travels the command lane and is sent once.

use crate::protocol::{read_response, Packet, Response};
use crate::serial::{RealSerialPort, SerialLink, SerialParams};
use parking_lot::Mutex;
use sandtable_core::{
    thread_safe_none, BoundedQueue, CancellationToken, ConnectionError, Error, Result,
    StepCommand, ThreadSafeOption,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Timing and capacity of a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Sleep between loop iterations
    pub poll_interval: Duration,
    /// Wait before resending a rejected position
    pub backoff: Duration,
    /// Wait for a response to each frame
    pub read_timeout: Duration,
    /// Pause after flushing the input buffer on open
    pub settle_delay: Duration,
    /// Capacity of the motion lane
    pub motion_queue_capacity: usize,
    /// Capacity of the command lane
    pub command_queue_capacity: usize,
    /// How long producers wait for room in a full lane
    pub enqueue_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            backoff: Duration::from_millis(500),
            read_timeout: Duration::from_millis(1000),
            settle_delay: Duration::from_millis(100),
            motion_queue_capacity: 25,
            command_queue_capacity: 25,
            enqueue_timeout: Duration::from_millis(5000),
        }
    }
}

/// Acknowledgement state of the motion lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionState {
    /// Nothing in flight
    Idle,
    /// A position frame was sent and is not yet confirmed
    AwaitingAck {
        /// Frame to resend until confirmed
        packet: Packet,
        /// When the table last answered it; `None` resends on the next pass
        last_sent_at: Option<Instant>,
        /// Number of times it was written
        attempts: u32,
    },
}

/// State owned by whichever thread drives the link
struct LinkLoop {
    link: Box<dyn SerialLink>,
    motion: Arc<BoundedQueue<Packet>>,
    commands: Arc<BoundedQueue<Packet>>,
    state: MotionState,
    in_flight: Arc<AtomicBool>,
    command_busy: Arc<AtomicBool>,
    buffer_size: ThreadSafeOption<u8>,
    backoff: Duration,
    read_timeout: Duration,
    poll_interval: Duration,
}

impl LinkLoop {
    fn run(mut self, cancel: CancellationToken, fault: ThreadSafeOption<ConnectionError>) -> Self {
        tracing::info!("Transport loop started on {}", self.link.name());
        while !cancel.is_cancelled() {
            if let Err(e) = self.tick() {
                tracing::error!("Transport loop stopping: {}", e);
                *fault.lock() = Some(e);
                break;
            }
            thread::sleep(self.poll_interval);
        }
        tracing::info!("Transport loop stopped");
        self
    }

    /// One iteration: motion lane first, then the command lane
    fn tick(&mut self) -> std::result::Result<(), ConnectionError> {
        self.service_motion()?;
        self.service_command()
    }

    fn service_motion(&mut self) -> std::result::Result<(), ConnectionError> {
        let packet = match &mut self.state {
            MotionState::AwaitingAck {
                last_sent_at: Some(at),
                ..
            } if at.elapsed() < self.backoff => return Ok(()),
            MotionState::AwaitingAck {
                packet, attempts, ..
            } => {
                *attempts += 1;
                tracing::debug!("Resending {} (attempt {})", packet, attempts);
                packet.clone()
            }
            MotionState::Idle => {
                // Set before the pop: an empty lane with the flag clear
                // means no frame is in hand
                self.in_flight.store(true, Ordering::SeqCst);
                let Some(packet) = self.motion.try_pop() else {
                    self.in_flight.store(false, Ordering::SeqCst);
                    return Ok(());
                };
                self.state = MotionState::AwaitingAck {
                    packet: packet.clone(),
                    last_sent_at: None,
                    attempts: 1,
                };
                packet
            }
        };

        match self.exchange(&packet)? {
            None => {
                tracing::debug!("No response to {}, keeping it pending", packet);
            }
            Some(Response::Confirm) => {
                tracing::trace!("Table confirmed {}", packet);
                self.settle_motion();
            }
            Some(response) if response.is_rejection() => {
                tracing::debug!("Table rejected {} with {:?}, backing off", packet, response);
                if let MotionState::AwaitingAck { last_sent_at, .. } = &mut self.state {
                    *last_sent_at = Some(Instant::now());
                }
            }
            Some(response) => {
                tracing::warn!("Unexpected response {:?} to {}, dropping it", response, packet);
                self.settle_motion();
            }
        }
        Ok(())
    }

    fn settle_motion(&mut self) {
        self.state = MotionState::Idle;
        self.in_flight.store(false, Ordering::SeqCst);
    }

    fn service_command(&mut self) -> std::result::Result<(), ConnectionError> {
        self.command_busy.store(true, Ordering::SeqCst);
        let result = self.send_next_command();
        self.command_busy.store(false, Ordering::SeqCst);
        result
    }

    fn send_next_command(&mut self) -> std::result::Result<(), ConnectionError> {
        let Some(packet) = self.commands.try_pop() else {
            return Ok(());
        };

        match self.exchange(&packet)? {
            None => tracing::warn!("No response to {} command, not resending", packet),
            Some(Response::Confirm) => tracing::debug!("Table confirmed {} command", packet),
            Some(Response::BufferSize(size)) => {
                tracing::info!("Table reports {} buffered positions", size);
                *self.buffer_size.lock() = Some(size);
            }
            Some(response) => {
                tracing::warn!("Table answered {} command with {:?}", packet, response)
            }
        }
        Ok(())
    }

    fn exchange(&mut self, packet: &Packet) -> std::result::Result<Option<Response>, ConnectionError> {
        self.link
            .write_all(&packet.encode())
            .map_err(|e| link_lost("write", e))?;
        read_response(self.link.as_mut(), self.read_timeout).map_err(|e| link_lost("read", e))
    }
}

fn link_lost(action: &str, error: io::Error) -> ConnectionError {
    ConnectionError::LinkLost {
        reason: format!("{} failed: {}", action, error),
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<LinkLoop>,
}

/// Reliable two-lane transport to the table.
///
/// Every method takes `&self`, so one transport can be shared between the
/// producers and whoever controls its lifecycle. The link is driven either
/// by the background loop ([`begin`](Self::begin) /
/// [`shutdown`](Self::shutdown)) or one iteration at a time with
/// [`poll_once`](Self::poll_once).
pub struct Transport {
    config: TransportConfig,
    motion: Arc<BoundedQueue<Packet>>,
    commands: Arc<BoundedQueue<Packet>>,
    in_flight: Arc<AtomicBool>,
    command_busy: Arc<AtomicBool>,
    buffer_size: ThreadSafeOption<u8>,
    fault: ThreadSafeOption<ConnectionError>,
    idle_loop: Mutex<Option<LinkLoop>>,
    running: Mutex<Option<RunningLoop>>,
}

impl Transport {
    /// Open a hardware port and wrap it
    pub fn open(params: &SerialParams, config: TransportConfig) -> Result<Self> {
        let port = RealSerialPort::open(params)?;
        Self::new(Box::new(port), config)
    }

    /// Wrap an open link. Stale input is discarded, then the link is left
    /// to settle for `settle_delay`.
    pub fn new(mut link: Box<dyn SerialLink>, config: TransportConfig) -> Result<Self> {
        link.clear_input().map_err(|e| ConnectionError::IoError {
            reason: format!("failed to flush {}: {}", link.name(), e),
        })?;
        if !config.settle_delay.is_zero() {
            thread::sleep(config.settle_delay);
        }

        let motion = Arc::new(BoundedQueue::new(config.motion_queue_capacity));
        let commands = Arc::new(BoundedQueue::new(config.command_queue_capacity));
        let in_flight = Arc::new(AtomicBool::new(false));
        let command_busy = Arc::new(AtomicBool::new(false));
        let buffer_size = thread_safe_none();

        let idle_loop = LinkLoop {
            link,
            motion: motion.clone(),
            commands: commands.clone(),
            state: MotionState::Idle,
            in_flight: in_flight.clone(),
            command_busy: command_busy.clone(),
            buffer_size: buffer_size.clone(),
            backoff: config.backoff,
            read_timeout: config.read_timeout,
            poll_interval: config.poll_interval,
        };

        Ok(Self {
            config,
            motion,
            commands,
            in_flight,
            command_busy,
            buffer_size,
            fault: thread_safe_none(),
            idle_loop: Mutex::new(Some(idle_loop)),
            running: Mutex::new(None),
        })
    }

    /// Queue a position on the motion lane
    pub fn send_position(&self, command: StepCommand) -> Result<()> {
        self.enqueue(&self.motion, "motion", Packet::position(command))
    }

    /// Queue a position given as raw values; exactly two `i32` values
    pub fn send_position_values(&self, values: &[i64]) -> Result<()> {
        let packet = Packet::position_from_values(values)?;
        self.enqueue(&self.motion, "motion", packet)
    }

    /// Queue a speed change
    pub fn update_speed(&self, steps_per_second: i64) -> Result<()> {
        let packet = Packet::speed(steps_per_second)?;
        self.enqueue(&self.commands, "command", packet)
    }

    /// Queue the homing routine
    pub fn home(&self) -> Result<()> {
        self.enqueue(&self.commands, "command", Packet::home())
    }

    /// Queue a start
    pub fn start(&self) -> Result<()> {
        self.enqueue(&self.commands, "command", Packet::start())
    }

    /// Queue a stop, followed by a clear if `clear` is set
    pub fn stop(&self, clear: bool) -> Result<()> {
        self.enqueue(&self.commands, "command", Packet::stop())?;
        if clear {
            self.enqueue(&self.commands, "command", Packet::clear())?;
        }
        Ok(())
    }

    /// Ask the table how many positions it has buffered. The answer shows
    /// up in [`reported_buffer_size`](Self::reported_buffer_size).
    pub fn request_buffer_size(&self) -> Result<()> {
        self.enqueue(&self.commands, "command", Packet::get_buffer_size())
    }

    /// Last buffer size the table reported
    pub fn reported_buffer_size(&self) -> Option<u8> {
        *self.buffer_size.lock()
    }

    fn enqueue(&self, lane: &BoundedQueue<Packet>, name: &str, packet: Packet) -> Result<()> {
        if let Some(fault) = self.fault() {
            return Err(fault.into());
        }
        lane.push_timeout(packet, self.config.enqueue_timeout)
            .map_err(|packet| {
                tracing::error!(
                    "Dropping {}: {} lane stayed full for {:?}",
                    packet,
                    name,
                    self.config.enqueue_timeout
                );
                ConnectionError::EnqueueTimeout {
                    queue: name.to_string(),
                    timeout_ms: self.config.enqueue_timeout.as_millis() as u64,
                }
            })?;
        Ok(())
    }

    /// Start the background loop
    pub fn begin(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ConnectionError::AlreadyRunning.into());
        }
        if let Some(fault) = self.fault() {
            return Err(fault.into());
        }
        let Some(link_loop) = self.idle_loop.lock().take() else {
            return Err(Error::other("serial link is no longer available"));
        };

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let fault = self.fault.clone();
        let handle = thread::Builder::new()
            .name("sandtable-link".to_string())
            .spawn(move || link_loop.run(loop_cancel, fault))?;

        *running = Some(RunningLoop { cancel, handle });
        Ok(())
    }

    /// Stop the background loop and wait for it to exit. Queued frames stay
    /// queued. Calling this when the loop is not running does nothing.
    pub fn shutdown(&self) -> Result<()> {
        let Some(running) = self.running.lock().take() else {
            tracing::debug!("Transport loop already stopped");
            return Ok(());
        };

        running.cancel.cancel();
        let link_loop = running
            .handle
            .join()
            .map_err(|_| Error::other("transport loop panicked"))?;
        *self.idle_loop.lock() = Some(link_loop);
        Ok(())
    }

    /// Run one loop iteration on the calling thread
    pub fn poll_once(&self) -> Result<()> {
        if self.running.lock().is_some() {
            return Err(ConnectionError::AlreadyRunning.into());
        }
        if let Some(fault) = self.fault() {
            return Err(fault.into());
        }
        let mut idle_loop = self.idle_loop.lock();
        let Some(link_loop) = idle_loop.as_mut() else {
            return Err(ConnectionError::NotRunning.into());
        };

        link_loop.tick().map_err(|e| {
            *self.fault.lock() = Some(e.clone());
            Error::from(e)
        })
    }

    /// Whether the background loop is alive
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Fault that stopped the link, if any
    pub fn fault(&self) -> Option<ConnectionError> {
        self.fault.lock().clone()
    }

    /// Whether the link has failed
    pub fn is_faulted(&self) -> bool {
        self.fault.lock().is_some()
    }

    /// Positions waiting on the motion lane
    pub fn motion_queue_len(&self) -> usize {
        self.motion.len()
    }

    /// Frames waiting on the command lane
    pub fn command_queue_len(&self) -> usize {
        self.commands.len()
    }

    /// Whether a position was sent and not yet confirmed
    pub fn awaiting_ack(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Both lanes are empty and nothing is in flight
    pub fn is_idle(&self) -> bool {
        self.motion.is_empty()
            && !self.awaiting_ack()
            && self.commands.is_empty()
            && !self.command_busy.load(Ordering::SeqCst)
    }

    /// Timing and capacity in use
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
            let _ = running.handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.backoff, Duration::from_millis(500));
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.motion_queue_capacity, 25);
        assert_eq!(config.command_queue_capacity, 25);
    }
}
