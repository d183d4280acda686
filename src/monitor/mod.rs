//! Watches the default output device and reports when audio starts flowing.
//!
//! Hardware callbacks are turned into [`HardwareEvent`] messages and consumed
//! by a single dedicated thread that owns the [`ActivityTracker`]. Activity is
//! published on a tokio channel so the consumer never runs on that thread.

pub mod state;
pub mod tracker;

pub use state::{ActivityStarted, ActivityState, HardwareEvent};
pub use tracker::ActivityTracker;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioDeviceDirectory, ListenerHost};

const MONITOR_THREAD_NAME: &str = "glued-monitor";

struct MonitorWorker {
    events: mpsc::UnboundedSender<HardwareEvent>,
    thread: JoinHandle<()>,
}

pub struct DeviceActivityMonitor<A, H>
where
    A: AudioDeviceDirectory + Clone + 'static,
    H: ListenerHost + Clone + 'static,
{
    audio: A,
    host: H,
    activity_tx: mpsc::UnboundedSender<ActivityStarted>,
    seed_running_state: bool,
    active: Arc<AtomicBool>,
    worker: Option<MonitorWorker>,
}

impl<A, H> DeviceActivityMonitor<A, H>
where
    A: AudioDeviceDirectory + Clone + 'static,
    H: ListenerHost + Clone + 'static,
{
    pub fn new(
        audio: A,
        host: H,
        activity_tx: mpsc::UnboundedSender<ActivityStarted>,
        seed_running_state: bool,
    ) -> Self {
        Self {
            audio,
            host,
            activity_tx,
            seed_running_state,
            active: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Begin watching. Calling this while already started does nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            debug!("Device activity monitor already started");
            return Ok(());
        }

        info!("Starting device activity monitor");
        self.active.store(true, Ordering::Release);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut tracker = ActivityTracker::new(
            self.audio.clone(),
            self.host.clone(),
            events_tx.clone(),
            Arc::clone(&self.active),
            self.seed_running_state,
        );
        tracker.attach();

        let activity_tx = self.activity_tx.clone();
        let spawned = std::thread::Builder::new()
            .name(MONITOR_THREAD_NAME.to_string())
            .spawn(move || run_event_loop(tracker, events_rx, activity_tx));

        match spawned {
            Ok(thread) => {
                self.worker = Some(MonitorWorker {
                    events: events_tx,
                    thread,
                });
                Ok(())
            }
            Err(e) => {
                // The tracker and its subscriptions were dropped with the closure
                self.active.store(false, Ordering::Release);
                Err(e).context("Failed to spawn device monitor thread")
            }
        }
    }

    /// Stop watching and release every hardware listener. Safe to call
    /// repeatedly; the monitor can be started again afterwards.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        info!("Stopping device activity monitor");
        self.active.store(false, Ordering::Release);

        if worker.events.send(HardwareEvent::Shutdown).is_err() {
            warn!("Monitor thread already exited");
        }
        if worker.thread.join().is_err() {
            error!("Monitor thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Takes effect on the next [`start`](Self::start)
    pub fn set_seed_running_state(&mut self, seed_running_state: bool) {
        self.seed_running_state = seed_running_state;
    }

    pub fn seed_running_state(&self) -> bool {
        self.seed_running_state
    }
}

impl<A, H> Drop for DeviceActivityMonitor<A, H>
where
    A: AudioDeviceDirectory + Clone + 'static,
    H: ListenerHost + Clone + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_event_loop<A, H>(
    mut tracker: ActivityTracker<A, H>,
    mut events: mpsc::UnboundedReceiver<HardwareEvent>,
    activity_tx: mpsc::UnboundedSender<ActivityStarted>,
) where
    A: AudioDeviceDirectory + Clone + 'static,
    H: ListenerHost,
{
    debug!("Monitor thread running");

    while let Some(event) = events.blocking_recv() {
        if event == HardwareEvent::Shutdown {
            break;
        }
        if let Some(activity) = tracker.handle(event) {
            if activity_tx.send(activity).is_err() {
                warn!("Activity receiver dropped, event discarded");
            }
        }
    }

    tracker.detach();
    debug!("Monitor thread exiting");
}
