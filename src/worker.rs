//! Planner draining
//!
//! The worker owns a FIFO of submitted planners and a background loop that
//! feeds every step command they produce into the transport's motion lane.
//! A full motion lane blocks the loop, which is what throttles drawing to
//! the table's pace.

use crate::commands::{Button, PlannerRequest};
use sandtable_communication::Transport;
use sandtable_core::{
    thread_safe_deque, thread_safe_none, CancellationToken, ConnectionError, Error,
    MachineGeometry, Result, StepCommand, ThreadSafeDeque, ThreadSafeOption,
};
use sandtable_planner::{Planner, Produced, DEFAULT_SAMPLES_PER_REVOLUTION};
use sandtable_settings::Config;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Pause between checks in [`Worker::wait_idle`]
const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Worker settings
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Sleep while no planner is queued
    pub idle_poll: Duration,
    /// Accuracy for drawing requests that give none, in mm²
    pub default_accuracy: f64,
    /// Step commands per spiral revolution
    pub spiral_samples_per_revolution: u32,
    /// Machine scale factors
    pub geometry: MachineGeometry,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_poll: Duration::from_millis(500),
            default_accuracy: 1.0,
            spiral_samples_per_revolution: DEFAULT_SAMPLES_PER_REVOLUTION,
            geometry: MachineGeometry::default(),
        }
    }
}

impl From<&Config> for WorkerConfig {
    fn from(config: &Config) -> Self {
        Self {
            idle_poll: Duration::from_millis(config.worker.idle_poll_ms),
            default_accuracy: config.worker.default_accuracy,
            spiral_samples_per_revolution: config.worker.spiral_samples_per_revolution,
            geometry: config.geometry(),
        }
    }
}

/// A planner waiting in the worker's queue
struct Job {
    id: Uuid,
    planner: Planner,
    /// Command produced but not yet accepted by the transport
    held: Option<StepCommand>,
}

enum Delivery {
    Sent,
    Cancelled,
    Abandoned,
}

/// State moved onto the worker thread
struct WorkerLoop {
    transport: Arc<Transport>,
    jobs: ThreadSafeDeque<Job>,
    current: ThreadSafeOption<Uuid>,
    idle_poll: Duration,
    cancel: CancellationToken,
}

impl WorkerLoop {
    fn run(self) {
        tracing::info!("Worker loop started");
        while !self.cancel.is_cancelled() {
            let job = {
                let mut jobs = self.jobs.lock();
                let job = jobs.pop_front();
                *self.current.lock() = job.as_ref().map(|job| job.id);
                job
            };

            match job {
                Some(job) => self.drain(job),
                None => thread::sleep(self.idle_poll),
            }
            *self.current.lock() = None;
        }
        tracing::info!("Worker loop stopped");
    }

    fn drain(&self, mut job: Job) {
        tracing::info!("Drawing job {}: {}", job.id, job.planner);
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Worker stopping, job {} will resume on restart", job.id);
                self.jobs.lock().push_front(job);
                return;
            }

            let command = match job.held.take() {
                Some(command) => command,
                None => match job.planner.produce() {
                    Produced::Step(command) => command,
                    Produced::EndOfPass(command) => {
                        tracing::debug!("Job {} finished a pass", job.id);
                        command
                    }
                    Produced::Done => {
                        tracing::info!("Job {} complete", job.id);
                        return;
                    }
                },
            };

            match self.deliver(command) {
                Delivery::Sent => {}
                Delivery::Cancelled => job.held = Some(command),
                Delivery::Abandoned => {
                    tracing::error!("Abandoning job {}", job.id);
                    return;
                }
            }
        }
    }

    fn deliver(&self, command: StepCommand) -> Delivery {
        loop {
            match self.transport.send_position(command) {
                Ok(()) => return Delivery::Sent,
                Err(e) if e.is_timeout() => {
                    if self.cancel.is_cancelled() {
                        return Delivery::Cancelled;
                    }
                    if !self.transport.is_running() {
                        tracing::error!("Transport stopped while {} was waiting", command);
                        return Delivery::Abandoned;
                    }
                    tracing::warn!("Motion lane still full, retrying {}", command);
                }
                Err(e) => {
                    tracing::error!("Failed to queue {}: {}", command, e);
                    return Delivery::Abandoned;
                }
            }
        }
    }
}

struct RunningWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Connects queued planners to the transport and forwards control buttons.
pub struct Worker {
    transport: Arc<Transport>,
    config: WorkerConfig,
    jobs: ThreadSafeDeque<Job>,
    current: ThreadSafeOption<Uuid>,
    running: Mutex<Option<RunningWorker>>,
}

impl Worker {
    /// Create a worker around a transport
    pub fn new(transport: Transport, config: WorkerConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            jobs: thread_safe_deque(),
            current: thread_safe_none(),
            running: Mutex::new(None),
        }
    }

    /// Start the transport loop and the worker loop
    pub fn start_worker(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ConnectionError::AlreadyRunning.into());
        }
        if !self.transport.is_running() {
            self.transport.begin()?;
        }

        let cancel = CancellationToken::new();
        let worker_loop = WorkerLoop {
            transport: self.transport.clone(),
            jobs: self.jobs.clone(),
            current: self.current.clone(),
            idle_poll: self.config.idle_poll,
            cancel: cancel.clone(),
        };
        let handle = thread::Builder::new()
            .name("sandtable-worker".to_string())
            .spawn(move || worker_loop.run())?;

        *running = Some(RunningWorker { cancel, handle });
        Ok(())
    }

    /// Stop the worker loop, then the transport loop, waiting for both.
    /// Unfinished jobs stay queued.
    pub fn end_workers(&self) -> Result<()> {
        if let Some(running) = self.running.lock().take() {
            running.cancel.cancel();
            running
                .handle
                .join()
                .map_err(|_| Error::other("worker loop panicked"))?;
        }
        self.transport.shutdown()
    }

    /// Whether the worker loop is alive
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Queue a built planner, returning its job id
    pub fn add_planner(&self, planner: impl Into<Planner>) -> Uuid {
        let planner = planner.into();
        let id = Uuid::new_v4();
        tracing::info!("Accepted job {}: {}", id, planner);
        self.jobs.lock().push_back(Job {
            id,
            planner,
            held: None,
        });
        id
    }

    /// Build and queue a planner from a request
    pub fn submit(&self, request: &PlannerRequest) -> Result<Uuid> {
        let planner = request.build(&self.config)?;
        Ok(self.add_planner(planner))
    }

    /// Forward a front-end button
    pub fn press(&self, button: Button) -> Result<()> {
        tracing::debug!("Button {}", button);
        match button {
            Button::Home => self.home(),
            Button::Start => self.start(),
            Button::Stop => self.stop(false),
            Button::Clear => self.stop(true),
        }
    }

    /// Run the homing routine
    pub fn home(&self) -> Result<()> {
        self.transport.home()
    }

    /// Start executing buffered positions
    pub fn start(&self) -> Result<()> {
        self.transport.start()
    }

    /// Stop, and drop the table's buffered positions if `clear` is set
    pub fn stop(&self, clear: bool) -> Result<()> {
        self.transport.stop(clear)
    }

    /// Change the motor speed
    pub fn speed(&self, steps_per_second: i64) -> Result<()> {
        self.transport.update_speed(steps_per_second)
    }

    /// Jobs queued behind the current one
    pub fn pending_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Job being drained right now
    pub fn current_job(&self) -> Option<Uuid> {
        *self.current.lock()
    }

    /// Wait until every job is drained and the transport has delivered
    /// everything. Returns `Ok(false)` on timeout and the link fault if the
    /// transport fails while waiting.
    pub fn wait_idle(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(fault) = self.transport.fault() {
                return Err(fault.into());
            }
            let drained = {
                let jobs = self.jobs.lock();
                jobs.is_empty() && self.current.lock().is_none()
            };
            if drained && self.transport.is_idle() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(IDLE_CHECK_INTERVAL);
        }
    }

    /// The transport this worker feeds
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

impl Drop for Worker {
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
    fn test_config_from_settings() {
        let mut settings = Config::default();
        settings.worker.idle_poll_ms = 20;
        settings.machine.radius_limit_mm = 200.0;

        let config = WorkerConfig::from(&settings);
        assert_eq!(config.idle_poll, Duration::from_millis(20));
        assert_eq!(config.geometry.radius_limit_mm, 200.0);
        assert_eq!(WorkerConfig::from(&Config::default()), WorkerConfig::default());
    }
}
