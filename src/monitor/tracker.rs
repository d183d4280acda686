use chrono::Local;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::{ActivityStarted, ActivityState, HardwareEvent};
use crate::audio::{
    AudioDeviceDirectory, AudioObjectId, HardwareCallback, ListenerHost, ListenerSubscription,
    OutputDeviceHandle,
};

#[derive(Debug)]
struct TrackedDevice {
    handle: OutputDeviceHandle,
    state: ActivityState,
}

/// The monitor's state machine.
///
/// Owns the tracked device, its [`ActivityState`] and both listener
/// subscriptions. Hardware callbacks only enqueue [`HardwareEvent`]s; every
/// transition happens in [`ActivityTracker::handle`] on the thread that owns
/// the tracker. Is-running callbacks read the property as they fire, so a
/// burst of notifications queued before the tracker catches up keeps every
/// edge.
pub struct ActivityTracker<A, H>
where
    A: AudioDeviceDirectory + Clone + 'static,
    H: ListenerHost,
{
    audio: A,
    host: H,
    events: mpsc::UnboundedSender<HardwareEvent>,
    active: Arc<AtomicBool>,
    seed_running_state: bool,
    tracked: Option<TrackedDevice>,
    default_subscription: Option<ListenerSubscription>,
    running_subscription: Option<ListenerSubscription>,
}

impl<A, H> ActivityTracker<A, H>
where
    A: AudioDeviceDirectory + Clone + 'static,
    H: ListenerHost,
{
    pub fn new(
        audio: A,
        host: H,
        events: mpsc::UnboundedSender<HardwareEvent>,
        active: Arc<AtomicBool>,
        seed_running_state: bool,
    ) -> Self {
        Self {
            audio,
            host,
            events,
            active,
            seed_running_state,
            tracked: None,
            default_subscription: None,
            running_subscription: None,
        }
    }

    /// Seed the tracked device and install both listeners.
    pub fn attach(&mut self) {
        self.retrack();

        let callback = self.forward(HardwareEvent::DefaultOutputChanged);
        match self.host.watch_default_output(callback) {
            Ok(subscription) => {
                info!("Registered listener for default output device changes");
                self.default_subscription = Some(subscription);
            }
            Err(e) => error!("{}; default output changes will go unnoticed", e),
        }

        self.bind_running_listener();
    }

    /// Release every listener. Queued events for released listeners are
    /// still delivered but no longer match a tracked device.
    pub fn detach(&mut self) {
        self.running_subscription = None;
        self.default_subscription = None;
        self.tracked = None;
        debug!("Released all hardware listeners");
    }

    /// Apply one hardware event, returning the activity it revealed, if any.
    pub fn handle(&mut self, event: HardwareEvent) -> Option<ActivityStarted> {
        match event {
            HardwareEvent::DefaultOutputChanged => {
                info!("Default output device changed, updating listeners");
                self.retrack();
                self.bind_running_listener();
                None
            }
            HardwareEvent::RunningChanged { device, running } => {
                self.running_changed(device, running)
            }
            HardwareEvent::Shutdown => None,
        }
    }

    pub fn tracked_device(&self) -> Option<AudioObjectId> {
        self.tracked.as_ref().map(|t| t.handle.id)
    }

    pub fn state(&self) -> Option<ActivityState> {
        self.tracked.as_ref().map(|t| t.state)
    }

    /// Device the live is-running subscription is bound to
    pub fn running_subscription_device(&self) -> Option<AudioObjectId> {
        self.running_subscription.as_ref().and_then(|s| s.device())
    }

    pub fn has_default_subscription(&self) -> bool {
        self.default_subscription.is_some()
    }

    fn forward(&self, event: HardwareEvent) -> HardwareCallback {
        let events = self.events.clone();
        let active = Arc::clone(&self.active);
        Arc::new(move || {
            if active.load(Ordering::Acquire) {
                // The receiver is gone once the monitor stopped
                let _ = events.send(event);
            }
        })
    }

    fn forward_running(&self, device: AudioObjectId) -> HardwareCallback {
        let events = self.events.clone();
        let active = Arc::clone(&self.active);
        let audio = self.audio.clone();
        Arc::new(move || {
            if !active.load(Ordering::Acquire) {
                return;
            }
            let running = match audio.is_running_somewhere(device) {
                Ok(running) => running,
                Err(e) => {
                    error!("{}", e);
                    false
                }
            };
            let _ = events.send(HardwareEvent::RunningChanged { device, running });
        })
    }

    fn retrack(&mut self) {
        self.tracked = match self.audio.current_default_output() {
            Ok(handle) => {
                info!("Current default output device: {}", handle);
                let state = self.initial_state(handle.id);
                Some(TrackedDevice { handle, state })
            }
            Err(e) => {
                warn!("No default output device to track: {}", e);
                None
            }
        };
    }

    fn initial_state(&self, device: AudioObjectId) -> ActivityState {
        if !self.seed_running_state {
            return ActivityState::Idle;
        }

        match self.audio.is_running_somewhere(device) {
            Ok(running) => {
                debug!("Seeded device {} as running = {}", device, running);
                ActivityState::from_running(running)
            }
            Err(e) => {
                warn!("Could not seed running state of device {}: {}", device, e);
                ActivityState::Idle
            }
        }
    }

    fn bind_running_listener(&mut self) {
        // Remove the previous listener before installing the next one
        if let Some(previous) = self.running_subscription.take() {
            debug!("Removing {} listener", previous.kind());
            drop(previous);
        }

        let Some(device) = self.tracked_device() else {
            warn!("No tracked output device, skip registering running listener");
            return;
        };

        let callback = self.forward_running(device);
        match self.host.watch_is_running(device, callback) {
            Ok(subscription) => {
                info!("Registered running-state listener on device {}", device);
                self.running_subscription = Some(subscription);
            }
            Err(e) => error!(
                "{}; activity on device {} goes unnoticed until the next device change",
                e, device
            ),
        }
    }

    fn running_changed(
        &mut self,
        device: AudioObjectId,
        now_running: bool,
    ) -> Option<ActivityStarted> {
        let Some(tracked) = self.tracked.as_mut() else {
            debug!("Ignoring running change on device {}: nothing tracked", device);
            return None;
        };
        if tracked.handle.id != device {
            debug!(
                "Ignoring stale running change on device {} (tracking {})",
                device, tracked.handle.id
            );
            return None;
        }

        debug!(
            "Device {} running = {} (prev: {})",
            device, now_running, tracked.state
        );

        if !tracked.state.observe(now_running) {
            return None;
        }

        let activity = ActivityStarted {
            device,
            device_name: tracked.handle.name.clone(),
            detected_at: Local::now(),
        };
        info!("Detected {}", activity);
        Some(activity)
    }
}
