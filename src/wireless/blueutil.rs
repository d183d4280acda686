//! Wireless backend driving the `blueutil` command-line tool.
//!
//! Device listings (`--paired`, `--recent`, `--info`) print one device per
//! line:
//!
//! ```text
//! address: 11-22-33-44-55-66, connected (master, -51 dBm), not favourite, paired, name: "AirPods Pro", recent access date: 2025-12-04 12:47:24 +0000
//! ```
//!
//! The connection field is `not connected` or `connected` optionally followed
//! by a parenthesised detail. The name is double-quoted with `\"` and `\\`
//! escapes. The date is `yyyy-MM-dd HH:mm:ss Z`, or `-` when the device was
//! never accessed. Lines that do not follow this grammar are reported as
//! skipped with a reason instead of being dropped silently.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace, warn};

use super::device::WirelessDeviceRecord;
use super::directory::WirelessBackend;
use crate::error::GluedError;

pub const DEFAULT_BLUEUTIL_PATH: &str = "/opt/homebrew/bin/blueutil";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^address: ([^,]+), "#,
        r#"(connected(?: \([^)]*\))?|not connected), "#,
        r#"(not favourite|favourite), "#,
        r#"(paired|not paired), "#,
        r#"name: "((?:[^"\\]|\\.)*)", "#,
        r#"recent access date: (.+)$"#,
    ))
    .expect("blueutil line pattern is valid")
});

/// One device line of `blueutil` output.
///
/// `connection_detail` and `favourite` are kept for diagnostics only; a
/// [`WirelessDeviceRecord`] carries the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueutilListing {
    pub address: String,
    pub connected: bool,
    /// Text inside the parentheses after `connected`, if any
    pub connection_detail: Option<String>,
    pub favourite: bool,
    pub paired: bool,
    pub name: String,
    pub recent_access: Option<DateTime<FixedOffset>>,
}

impl From<BlueutilListing> for WirelessDeviceRecord {
    fn from(listing: BlueutilListing) -> Self {
        WirelessDeviceRecord {
            address: listing.address,
            name: listing.name,
            is_connected: listing.connected,
            is_paired: listing.paired,
            last_access: listing.recent_access,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The line does not match the listing grammar
    Malformed,
    InvalidDate(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed => write!(f, "line does not match device listing format"),
            SkipReason::InvalidDate(date) => write!(f, "invalid recent access date '{date}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the tool output
    pub line_number: usize,
    pub line: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedListing {
    pub devices: Vec<BlueutilListing>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse `blueutil` device listing output. Blank lines are ignored.
pub fn parse_listing(output: &str) -> ParsedListing {
    let mut parsed = ParsedListing::default();

    for (index, raw_line) in output.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(listing) => parsed.devices.push(listing),
            Err(reason) => {
                debug!("Skipping blueutil line {}: {} ({})", index + 1, line, reason);
                parsed.skipped.push(SkippedLine {
                    line_number: index + 1,
                    line: line.to_string(),
                    reason,
                });
            }
        }
    }

    parsed
}

fn parse_line(line: &str) -> Result<BlueutilListing, SkipReason> {
    let captures = LINE_PATTERN.captures(line).ok_or(SkipReason::Malformed)?;
    let field = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or_default();

    let connection = field(2);
    let connection_detail = connection
        .strip_prefix("connected (")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::to_string);

    let name = unescape_name(field(5));

    let date = field(6).trim();
    let recent_access = if date == "-" {
        None
    } else {
        Some(
            DateTime::parse_from_str(date, DATE_FORMAT)
                .map_err(|_| SkipReason::InvalidDate(date.to_string()))?,
        )
    };

    Ok(BlueutilListing {
        address: field(1).trim().to_string(),
        connected: connection.starts_with("connected"),
        connection_detail,
        favourite: field(3) == "favourite",
        paired: field(4) == "paired",
        name,
        recent_access,
    })
}

// The line pattern guarantees every backslash is followed by a character
fn unescape_name(quoted: &str) -> String {
    let mut name = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => name.extend(chars.next()),
            _ => name.push(c),
        }
    }

    name
}

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external commands - allows for testing without spawning processes
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[&str]) -> std::io::Result<CommandOutput>;
}

pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &Path, args: &[&str]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// [`WirelessBackend`] that shells out to `blueutil`.
pub struct BlueutilBackend<R: CommandRunner = SystemCommandRunner> {
    program: PathBuf,
    runner: R,
}

impl BlueutilBackend<SystemCommandRunner> {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_runner(program, SystemCommandRunner)
    }
}

impl<R: CommandRunner> BlueutilBackend<R> {
    pub fn with_runner(program: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn tool_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Run a listing command, `None` when the tool fails
    fn list(&self, args: &[&str]) -> Option<Vec<WirelessDeviceRecord>> {
        let output = match self.runner.run(&self.program, args) {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {} {}: {}", self.tool_name(), args.join(" "), e);
                return None;
            }
        };

        if !output.success() {
            warn!(
                "{} {} exited with {:?}: {}",
                self.tool_name(),
                args.join(" "),
                output.status,
                output.stderr.trim()
            );
            return None;
        }

        let parsed = parse_listing(&output.stdout);
        for skipped in &parsed.skipped {
            warn!(
                "Ignoring unparseable {} output line {}: {}",
                self.tool_name(),
                skipped.line_number,
                skipped.reason
            );
        }

        trace!("{} {} listed {} devices", self.tool_name(), args.join(" "), parsed.devices.len());
        Some(parsed.devices.into_iter().map(Into::into).collect())
    }
}

impl<R: CommandRunner> WirelessBackend for BlueutilBackend<R> {
    fn paired(&self) -> Option<Vec<WirelessDeviceRecord>> {
        self.list(&["--paired"])
    }

    fn recent(&self) -> Vec<WirelessDeviceRecord> {
        self.list(&["--recent"]).unwrap_or_default()
    }

    fn lookup_address(&self, address: &str) -> Option<WirelessDeviceRecord> {
        self.list(&["--info", address])?.into_iter().next()
    }

    fn open_connection(&self, device: &WirelessDeviceRecord) -> Result<(), GluedError> {
        let output = self
            .runner
            .run(&self.program, &["--connect", &device.address])
            .map_err(|e| GluedError::ToolFailed {
                tool: self.tool_name(),
                message: e.to_string(),
            })?;

        if output.success() {
            Ok(())
        } else {
            Err(GluedError::ConnectFailed {
                identifier: device.address.clone(),
                status: output.status.unwrap_or(-1),
            })
        }
    }
}
