use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};
use tracing::{Level, error, info, warn};

use glued::audio::{AudioDeviceDirectory, system_audio};
use glued::config::{Config, ConfigLoader};
use glued::logging::{self, LoggingConfig};
use glued::notifications::DefaultNotificationManager;
use glued::service::{GlueService, SignalHandler};
use glued::target::{FileTargetStore, TargetDevice, TargetPreference};
use glued::wireless::{BlueutilBackend, WirelessDeviceDirectory, WirelessDirectory};
use glued::{SwitchOrchestrator, SwitchOutcome, SwitchReport};

const LOG_RETENTION_DAYS: u64 = 14;

#[derive(Parser)]
#[command(name = "glued")]
#[command(
    about = "Connect a saved wireless audio device and switch output to it when audio starts"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Saved target file path
    #[arg(long, global = true)]
    target_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for audio activity and glue the saved target (default)
    Run,
    /// List output-capable audio devices
    ListOutputs,
    /// List paired wireless devices
    Paired,
    /// Show the current default output device
    ShowDefault,
    /// Make a device the default and system output
    Switch {
        /// Exact device name
        #[arg(short, long)]
        device: String,
    },
    /// Connect a wireless device by address or exact name
    Connect { identifier: String },
    /// Manage the saved target device
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },
    /// Connect and switch to the saved target right now
    GlueNow,
    /// Validate the configuration file
    CheckConfig,
    /// Send a test notification
    TestNotification,
}

#[derive(Subcommand)]
enum TargetAction {
    /// Show the saved target
    Show,
    /// Save a target. Without --name the identifier is resolved among paired devices.
    Set {
        identifier: String,
        /// Audio output name, when it differs from what the wireless stack reports
        #[arg(long)]
        name: Option<String>,
    },
    /// Forget the saved target
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let loader = match cli.config.clone() {
        Some(path) => ConfigLoader::new_production(path),
        None => ConfigLoader::new_with_default_path()?,
    };

    if let Commands::CheckConfig = command {
        return check_config(&loader);
    }

    let config = loader.load_config()?;
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.general.level()?
    };

    let target_path = match cli.target_file.clone() {
        Some(path) => path,
        None => FileTargetStore::default_path()?,
    };
    let store = FileTargetStore::new_production(target_path);

    if let Commands::Run = command {
        let (_guard, log_dir) =
            logging::initialize_logging(LoggingConfig::daemon(level, config.general.log_format))?;
        if let Some(dir) = log_dir {
            info!("Logging to {}", dir.display());
            if let Err(e) = logging::cleanup_old_logs(&dir, LOG_RETENTION_DAYS) {
                warn!("Failed to clean up old logs: {}", e);
            }
        }
        return run_daemon(loader, config, store).await;
    }

    let console_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    logging::initialize_logging(LoggingConfig::console(console_level))?;

    let wireless = wireless_directory(&config);
    match command {
        Commands::ListOutputs => list_outputs(),
        Commands::Paired => list_paired(wireless, store),
        Commands::ShowDefault => show_default(),
        Commands::Switch { device } => switch_output(&device),
        Commands::Connect { identifier } => connect(&wireless, &identifier),
        Commands::Target { action } => manage_target(&wireless, &store, action),
        Commands::GlueNow => glue_now(wireless, store),
        Commands::TestNotification => test_notification(&config),
        Commands::Run | Commands::CheckConfig => Ok(()),
    }
}

fn wireless_directory(config: &Config) -> WirelessDirectory<BlueutilBackend> {
    WirelessDirectory::new(BlueutilBackend::new(config.wireless.blueutil_path.clone()))
}

async fn run_daemon(
    loader: ConfigLoader<glued::system::StandardFileSystem>,
    config: Config,
    store: FileTargetStore<glued::system::StandardFileSystem>,
) -> Result<()> {
    info!("Starting glued daemon");

    let audio = system_audio()?;
    let wireless = wireless_directory(&config);
    if !wireless.available() {
        warn!(
            "Wireless tool unavailable at {}, connect steps will fail",
            config.wireless.blueutil_path.display()
        );
    }
    if store.load().is_none() {
        warn!("No target device saved yet; run `glued target set <address>`");
    }

    let notifications = DefaultNotificationManager::new(&config.notifications);
    let config_path = loader.get_config_path().to_path_buf();
    let mut service = GlueService::new(audio, wireless, store, notifications, &config)
        .with_config_source(move || {
            ConfigLoader::new_production(config_path.clone()).reload_config()
        });

    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let signal_handler = SignalHandler::new(signal_tx);
    tokio::spawn(async move {
        if let Err(e) = signal_handler.listen_for_signals().await {
            error!("Signal handler error: {}", e);
        }
    });

    let mut outcomes = service.subscribe();
    tokio::spawn(async move {
        loop {
            match outcomes.recv().await {
                Ok(SwitchOutcome::Attempted(report)) => print_report(&report),
                Ok(SwitchOutcome::NothingToDo) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Missed {} switch outcomes", skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("glued daemon started");
    println!("  Waiting for audio activity on the default output");
    println!("  Press Ctrl+C to stop");

    service.run(signal_rx).await?;

    println!("Daemon stopped");
    Ok(())
}

fn check_config(loader: &ConfigLoader<glued::system::StandardFileSystem>) -> Result<()> {
    println!("Configuration validation:");
    println!("  File: {}", loader.get_config_path().display());

    match loader.check_config() {
        Ok(config) => {
            println!("  ✓ Configuration file parsed successfully");
            println!("  ✓ Log level: {}", config.general.log_level);
            println!("  ✓ Log format: {:?}", config.general.log_format);
            println!(
                "  ✓ Seed running state: {}",
                config.monitor.seed_running_state
            );
            println!(
                "  ✓ blueutil: {}",
                config.wireless.blueutil_path.display()
            );
            Ok(())
        }
        Err(e) => {
            println!("  ✗ {:#}", e);
            Err(e)
        }
    }
}

fn list_outputs() -> Result<()> {
    let audio = system_audio()?;
    let devices = audio.list_output_devices()?;
    let default_id = audio.current_default_output().ok().map(|d| d.id);

    println!("Output devices:");
    if devices.is_empty() {
        println!("  No output devices found!");
        return Ok(());
    }

    for (i, device) in devices.iter().enumerate() {
        let marker = if Some(device.id) == default_id { " (default)" } else { "" };
        println!("  {}. {}{}", i + 1, device, marker);
    }
    Ok(())
}

fn show_default() -> Result<()> {
    let audio = system_audio()?;
    match audio.current_default_output() {
        Ok(device) => println!("Default output: {}", device),
        Err(e) => println!("Default output: none available ({})", e),
    }
    Ok(())
}

fn switch_output(device: &str) -> Result<()> {
    let audio = system_audio()?;
    println!("Switching output device to: {}", device);

    match audio.set_default_output(device) {
        Ok(()) => {
            println!("✓ Successfully switched output device to: {}", device);
            Ok(())
        }
        Err(e) => {
            println!("✗ Failed to switch device: {}", e);
            Err(e.into())
        }
    }
}

fn connect(wireless: &WirelessDirectory<BlueutilBackend>, identifier: &str) -> Result<()> {
    println!("Connecting: {}", identifier);
    match wireless.connect(identifier) {
        Ok(()) => {
            println!("✓ Connected {}", identifier);
            Ok(())
        }
        Err(e) => {
            println!("✗ {}", e);
            Err(e.into())
        }
    }
}

fn list_paired(
    wireless: WirelessDirectory<BlueutilBackend>,
    store: FileTargetStore<glued::system::StandardFileSystem>,
) -> Result<()> {
    let orchestrator = SwitchOrchestrator::new(system_audio()?, wireless, store);
    let listing = orchestrator.device_listing();

    println!(
        "Default output: {}",
        listing.default_output.as_deref().unwrap_or("(unknown)")
    );
    println!("Paired devices:");
    if listing.devices.is_empty() {
        println!("  None (or the wireless tool is unavailable)");
    }
    for device in &listing.devices {
        let marker = if device.is_target { "★" } else { " " };
        println!("  {} {}", marker, device.record);
    }
    Ok(())
}

fn manage_target(
    wireless: &WirelessDirectory<BlueutilBackend>,
    store: &FileTargetStore<glued::system::StandardFileSystem>,
    action: TargetAction,
) -> Result<()> {
    match action {
        TargetAction::Show => match store.load() {
            Some(target) => println!("Target: {}", target),
            None => println!("No target saved ({})", store.path().display()),
        },
        TargetAction::Set { identifier, name } => {
            let target = match name {
                Some(name) => TargetDevice::new(identifier, name),
                None => {
                    let record = wireless.resolve(&identifier).with_context(|| {
                        format!("No paired or recent device matches {}", identifier)
                    })?;
                    TargetDevice::new(record.address, record.name)
                }
            };
            store.save(&target)?;
            println!("✓ Target set to {}", target);
        }
        TargetAction::Clear => {
            store.clear()?;
            println!("✓ Target cleared");
        }
    }
    Ok(())
}

fn glue_now(
    wireless: WirelessDirectory<BlueutilBackend>,
    store: FileTargetStore<glued::system::StandardFileSystem>,
) -> Result<()> {
    let orchestrator = SwitchOrchestrator::new(system_audio()?, wireless, store);

    match orchestrator.switch_to_saved_target() {
        SwitchOutcome::NothingToDo => {
            println!("No target saved, nothing to do");
            Ok(())
        }
        SwitchOutcome::Attempted(report) => {
            print_report(&report);
            if !report.is_success() {
                bail!("switch to {} incomplete", report.target);
            }
            Ok(())
        }
    }
}

fn test_notification(config: &Config) -> Result<()> {
    let manager = DefaultNotificationManager::new(&config.notifications);
    match manager.test_notification() {
        Ok(()) => {
            println!("✓ Test notification sent");
            Ok(())
        }
        Err(e) => {
            println!("✗ Failed to send notification: {}", e);
            Err(e)
        }
    }
}

fn print_report(report: &SwitchReport) {
    println!("Switch to {}:", report.target);
    match &report.connect {
        Ok(()) => println!("  ✓ connected"),
        Err(e) => println!("  ✗ connect: {}", e),
    }
    match &report.audio {
        Ok(()) => println!("  ✓ output switched"),
        Err(e) => println!("  ✗ output: {}", e),
    }
}
