use anyhow::{Context, Result};
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    /// SIGTERM or SIGINT
    Shutdown,
    /// SIGHUP: re-read the configuration
    Reload,
}

impl SignalType {
    pub fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            SIGTERM | SIGINT => Some(SignalType::Shutdown),
            SIGHUP => Some(SignalType::Reload),
            _ => None,
        }
    }
}

/// Forwards process signals to the service loop as [`SignalType`] messages
#[derive(Clone)]
pub struct SignalHandler {
    signal_sender: mpsc::UnboundedSender<SignalType>,
}

impl SignalHandler {
    pub fn new(signal_sender: mpsc::UnboundedSender<SignalType>) -> Self {
        Self { signal_sender }
    }

    /// Runs until a shutdown signal arrives or the receiver goes away
    pub async fn listen_for_signals(&self) -> Result<()> {
        let mut signals =
            Signals::new([SIGTERM, SIGINT, SIGHUP]).context("Failed to register signal handlers")?;
        let handle = signals.handle();

        info!("Signal handler initialized, listening for SIGTERM, SIGINT, SIGHUP");

        while let Some(signal) = signals.next().await {
            let Some(kind) = SignalType::from_signal(signal) else {
                warn!("Received unexpected signal: {}", signal);
                continue;
            };

            match kind {
                SignalType::Shutdown => {
                    info!("Received shutdown signal ({}), initiating graceful shutdown", signal)
                }
                SignalType::Reload => info!("Received SIGHUP, requesting configuration reload"),
            }

            if self.signal_sender.send(kind).is_err() {
                warn!("Service loop is gone, stopping signal handler");
                break;
            }
            if kind == SignalType::Shutdown {
                break;
            }
        }

        handle.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_mapping() {
        assert_eq!(SignalType::from_signal(SIGTERM), Some(SignalType::Shutdown));
        assert_eq!(SignalType::from_signal(SIGINT), Some(SignalType::Shutdown));
        assert_eq!(SignalType::from_signal(SIGHUP), Some(SignalType::Reload));
        assert_eq!(SignalType::from_signal(SIGUSR1), None);
    }
}
