use anyhow::Result;
use tracing::{debug, error, info};

use crate::config::NotificationConfig;
use crate::orchestrator::SwitchReport;

#[cfg(not(any(test, feature = "test-mocks")))]
pub type DefaultNotificationManager = NotificationManager<MacOSNotificationSender>;

#[cfg(any(test, feature = "test-mocks"))]
pub type DefaultNotificationManager = NotificationManager<TestNotificationSender>;

/// Trait for sending notifications - allows for testing without system calls
pub trait NotificationSender: Send + Sync {
    fn send(&self, title: &str, body: &str) -> Result<()>;
}

/// Production notification sender using macOS osascript
pub struct MacOSNotificationSender;

impl NotificationSender for MacOSNotificationSender {
    fn send(&self, title: &str, body: &str) -> Result<()> {
        send_native_macos_notification(title, body)
    }
}

/// Records notifications instead of showing them
#[cfg(any(test, feature = "test-mocks"))]
#[derive(Default)]
pub struct TestNotificationSender {
    pub sent_notifications: std::sync::Mutex<Vec<(String, String)>>,
    pub should_fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-mocks"))]
impl TestNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_sent_notifications(&self) -> Vec<(String, String)> {
        self.sent_notifications.lock().unwrap().clone()
    }

    pub fn set_failure(&self, should_fail: bool) {
        self.should_fail
            .store(should_fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-mocks"))]
impl NotificationSender for TestNotificationSender {
    fn send(&self, title: &str, body: &str) -> Result<()> {
        if self.should_fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Mock notification failure"));
        }
        debug!("Test notification: {} - {}", title, body);
        self.sent_notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Reports switch outcomes as desktop notifications
pub struct NotificationManager<T: NotificationSender = MacOSNotificationSender> {
    show_switch_results: bool,
    show_failures: bool,
    sender: T,
}

impl DefaultNotificationManager {
    pub fn new(config: &NotificationConfig) -> Self {
        #[cfg(not(any(test, feature = "test-mocks")))]
        let sender = MacOSNotificationSender;
        #[cfg(any(test, feature = "test-mocks"))]
        let sender = TestNotificationSender::new();

        Self::with_sender(config, sender)
    }
}

impl<T: NotificationSender> NotificationManager<T> {
    pub fn with_sender(config: &NotificationConfig, sender: T) -> Self {
        Self {
            show_switch_results: config.show_switch_results,
            show_failures: config.show_failures,
            sender,
        }
    }

    pub fn sender(&self) -> &T {
        &self.sender
    }

    /// Apply new settings after a configuration reload
    pub fn update_config(&mut self, config: &NotificationConfig) {
        self.show_switch_results = config.show_switch_results;
        self.show_failures = config.show_failures;
    }

    /// Notify about a finished switch. Returns whether anything was sent.
    pub fn switch_reported(&self, report: &SwitchReport) -> Result<bool> {
        let (title, body, enabled) = if report.is_success() {
            (
                "Glued",
                format!("🎧 Audio switched to {}", report.target.name),
                self.show_switch_results,
            )
        } else if report.is_partial() {
            (
                "Glued: Partial Switch",
                report.to_string(),
                self.show_switch_results || self.show_failures,
            )
        } else {
            (
                "Glued: Switch Failed",
                format!("Could not switch to {}", report.target.name),
                self.show_failures,
            )
        };

        if !enabled {
            debug!("Notification suppressed by configuration: {}", title);
            return Ok(false);
        }

        self.sender.send(title, &body)?;
        info!("Sent notification: {} - {}", title, body);
        Ok(true)
    }

    /// Send a fixed notification regardless of settings, for `glued test-notification`
    pub fn test_notification(&self) -> Result<()> {
        if let Err(e) = self.sender.send("Glued", "Notifications are working") {
            error!("Failed to send notification: {}", e);
            error!("Check Do Not Disturb and whether osascript is restricted");
            return Err(e);
        }
        info!("Test notification sent successfully");
        Ok(())
    }
}

fn send_native_macos_notification(title: &str, body: &str) -> Result<()> {
    use std::process::Command;

    let script = format!(
        r#"display notification "{}" with title "{}""#,
        body.replace('\\', "\\\\").replace('"', "\\\""),
        title.replace('\\', "\\\\").replace('"', "\\\"")
    );

    let output = Command::new("osascript").args(["-e", &script]).output()?;

    if output.status.success() {
        Ok(())
    } else {
        let error = String::from_utf8_lossy(&output.stderr);
        Err(anyhow::anyhow!("osascript failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GluedError;
    use crate::target::TargetDevice;
    use chrono::Local;

    fn report(connect_ok: bool, audio_ok: bool) -> SwitchReport {
        let fail = || GluedError::DeviceNotFound("AirPods".to_string());
        SwitchReport {
            target: TargetDevice::new("AA:BB:CC:DD:EE:FF", "AirPods"),
            connect: if connect_ok { Ok(()) } else { Err(fail()) },
            audio: if audio_ok { Ok(()) } else { Err(fail()) },
            finished_at: Local::now(),
        }
    }

    #[test]
    fn test_success_notification() {
        let manager = DefaultNotificationManager::new(&NotificationConfig::default());

        assert!(manager.switch_reported(&report(true, true)).unwrap());

        let sent = manager.sender().get_sent_notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Glued");
        assert!(sent[0].1.contains("AirPods"));
    }

    #[test]
    fn test_failure_notification_respects_config() {
        let config = NotificationConfig {
            show_switch_results: true,
            show_failures: false,
        };
        let manager = NotificationManager::with_sender(&config, TestNotificationSender::new());

        assert!(!manager.switch_reported(&report(false, false)).unwrap());
        assert!(manager.switch_reported(&report(false, true)).unwrap());

        let sent = manager.sender().get_sent_notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Glued: Partial Switch");
    }

    #[test]
    fn test_update_config_silences_results() {
        let mut manager = DefaultNotificationManager::new(&NotificationConfig::default());
        manager.update_config(&NotificationConfig {
            show_switch_results: false,
            show_failures: true,
        });

        assert!(!manager.switch_reported(&report(true, true)).unwrap());
        assert!(manager.switch_reported(&report(false, false)).unwrap());
        assert_eq!(
            manager.sender().get_sent_notifications()[0].0,
            "Glued: Switch Failed"
        );
    }

    #[test]
    fn test_notification_ignores_switch_settings() {
        let manager = DefaultNotificationManager::new(&NotificationConfig {
            show_switch_results: false,
            show_failures: false,
        });

        manager.test_notification().unwrap();

        assert_eq!(
            manager.sender().get_sent_notifications(),
            vec![("Glued".to_string(), "Notifications are working".to_string())]
        );
    }

    #[test]
    fn test_sender_failure_propagates() {
        let manager = DefaultNotificationManager::new(&NotificationConfig::default());
        manager.sender().set_failure(true);

        assert!(manager.switch_reported(&report(true, true)).is_err());
        assert!(manager.test_notification().is_err());
    }
}
