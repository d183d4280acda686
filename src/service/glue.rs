use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::signals::SignalType;
use crate::audio::{AudioDeviceDirectory, ListenerHost};
use crate::config::Config;
use crate::monitor::{ActivityStarted, DeviceActivityMonitor};
use crate::notifications::{NotificationManager, NotificationSender};
use crate::orchestrator::{SwitchOrchestrator, SwitchOutcome};
use crate::target::TargetPreference;
use crate::wireless::WirelessDeviceDirectory;

const OUTCOME_CHANNEL_CAPACITY: usize = 16;

/// Produces a fresh configuration when SIGHUP asks for a reload
pub type ConfigSource = Box<dyn Fn() -> Result<Config> + Send + Sync>;

/// The daemon: switches to the saved target whenever audio starts playing.
pub struct GlueService<A, W, T, N>
where
    A: AudioDeviceDirectory + ListenerHost + Clone + 'static,
    W: WirelessDeviceDirectory + 'static,
    T: TargetPreference + 'static,
    N: NotificationSender,
{
    monitor: DeviceActivityMonitor<A, A>,
    activity_rx: mpsc::UnboundedReceiver<ActivityStarted>,
    orchestrator: Arc<SwitchOrchestrator<A, W, T>>,
    outcomes: broadcast::Sender<SwitchOutcome>,
    notifications: NotificationManager<N>,
    config_source: Option<ConfigSource>,
}

impl<A, W, T, N> GlueService<A, W, T, N>
where
    A: AudioDeviceDirectory + ListenerHost + Clone + 'static,
    W: WirelessDeviceDirectory + 'static,
    T: TargetPreference + 'static,
    N: NotificationSender,
{
    pub fn new(
        audio: A,
        wireless: W,
        preference: T,
        notifications: NotificationManager<N>,
        config: &Config,
    ) -> Self {
        let (activity_tx, activity_rx) = mpsc::unbounded_channel();
        let monitor = DeviceActivityMonitor::new(
            audio.clone(),
            audio.clone(),
            activity_tx,
            config.monitor.seed_running_state,
        );
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);

        Self {
            monitor,
            activity_rx,
            orchestrator: Arc::new(SwitchOrchestrator::new(audio, wireless, preference)),
            outcomes,
            notifications,
            config_source: None,
        }
    }

    pub fn with_config_source(
        mut self,
        source: impl Fn() -> Result<Config> + Send + Sync + 'static,
    ) -> Self {
        self.config_source = Some(Box::new(source));
        self
    }

    /// Every orchestration outcome, for the presentation layer
    pub fn subscribe(&self) -> broadcast::Receiver<SwitchOutcome> {
        self.outcomes.subscribe()
    }

    pub fn notifications(&self) -> &NotificationManager<N> {
        &self.notifications
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }

    pub fn start(&mut self) -> Result<()> {
        self.monitor.start()
    }

    /// Main loop. Returns after a shutdown signal, once any switch in
    /// progress has finished.
    ///
    /// Switches run one at a time. Activity detected while a switch is in
    /// progress is queued and gets its own switch once the current one ends.
    pub async fn run(&mut self, mut signals: mpsc::UnboundedReceiver<SignalType>) -> Result<()> {
        self.start()?;
        info!("Glue service running, waiting for audio activity");

        let mut in_flight: Option<JoinHandle<SwitchOutcome>> = None;
        let mut pending: VecDeque<ActivityStarted> = VecDeque::new();

        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(SignalType::Shutdown) => {
                        info!("Shutdown signal received, stopping service");
                        break;
                    }
                    Some(SignalType::Reload) => self.reload(),
                    None => {
                        warn!("Signal channel closed, stopping service");
                        break;
                    }
                },
                joined = wait_for(&mut in_flight), if in_flight.is_some() => {
                    self.finish_switch(joined);
                    in_flight = pending.pop_front().map(|next| self.spawn_switch(next));
                }
                Some(activity) = self.activity_rx.recv() => {
                    if in_flight.is_some() {
                        debug!("Switch in progress, queueing {}", activity);
                        pending.push_back(activity);
                        continue;
                    }
                    in_flight = Some(self.spawn_switch(activity));
                }
            }
        }

        if in_flight.is_some() {
            info!("Waiting for the switch in progress to finish");
            let joined = wait_for(&mut in_flight).await;
            self.finish_switch(joined);
        }
        if !pending.is_empty() {
            info!("Dropping {} queued activity event(s) on shutdown", pending.len());
        }

        self.shutdown();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.monitor.stop();
        info!("Glue service stopped");
    }

    /// Apply a reloaded configuration to the running service
    pub fn apply_config(&mut self, config: &Config) -> Result<()> {
        config.validate()?;
        self.notifications.update_config(&config.notifications);

        let seed = config.monitor.seed_running_state;
        if seed != self.monitor.seed_running_state() {
            info!("Restarting monitor with seed_running_state = {}", seed);
            let was_running = self.monitor.is_running();
            self.monitor.stop();
            self.monitor.set_seed_running_state(seed);
            if was_running {
                self.monitor.start()?;
            }
        }

        Ok(())
    }

    fn reload(&mut self) {
        let loaded = match &self.config_source {
            Some(source) => {
                info!("Reloading configuration");
                source()
            }
            None => {
                warn!("No configuration source, reload request ignored");
                return;
            }
        };

        let result = loaded.and_then(|config| self.apply_config(&config));
        match result {
            Ok(()) => info!("Configuration reloaded successfully"),
            Err(e) => error!("Failed to reload configuration: {:#}", e),
        }
    }

    fn spawn_switch(&self, activity: ActivityStarted) -> JoinHandle<SwitchOutcome> {
        info!("{}, switching to saved target", activity);
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::task::spawn_blocking(move || orchestrator.switch_to_saved_target())
    }

    fn finish_switch(&self, joined: Result<SwitchOutcome, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Switch task failed: {}", e);
                return;
            }
        };

        match &outcome {
            SwitchOutcome::NothingToDo => debug!("Activity ignored, no target saved"),
            SwitchOutcome::Attempted(report) => {
                info!("Switch finished: {}", report);
                if let Err(e) = self.notifications.switch_reported(report) {
                    warn!("Failed to send notification: {}", e);
                }
            }
        }

        if self.outcomes.send(outcome).is_err() {
            debug!("No outcome subscribers");
        }
    }
}

async fn wait_for(
    task: &mut Option<JoinHandle<SwitchOutcome>>,
) -> Result<SwitchOutcome, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
