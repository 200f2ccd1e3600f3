use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use kegboard_device::{wait_for_device, Device};
use kegboard_transport::{DEFAULT_DEVICE_PATTERNS, DEFAULT_SPEED};
use tracing::info;

use crate::exit::{device_error, CliError, CliResult, FAILURE, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod monitor;
pub mod tester;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for a kegboard and print every message it sends.
    Monitor(MonitorArgs),
    /// Cycle the board's outputs on and off.
    Tester(TesterArgs),
    /// Ping a kegboard and print its firmware version and serial number.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Tester(args) => tester::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device path (serial port or capture file). Default: first matching
    /// /dev/ttyUSB*, /dev/ttyACM*, /dev/cu.usbserial* or /dev/tty.usbmodem*.
    #[arg(long, short = 'd', env = "KEGBOARD_DEVICE", value_name = "PATH")]
    pub device: Option<PathBuf>,
    /// Serial speed in baud.
    #[arg(long, env = "KEGBOARD_SPEED", default_value_t = DEFAULT_SPEED)]
    pub speed: u32,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Delay between scans while waiting for a board (e.g. 500ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub scan_interval: String,
}

#[derive(Args, Debug)]
pub struct TesterArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Number of outputs to cycle, starting at output 0.
    #[arg(long, default_value_t = 4)]
    pub outputs: u8,
    /// Pause after each output command (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Stop after N full cycles. Default: run until interrupted.
    #[arg(long)]
    pub cycles: Option<usize>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Pings to send before giving up.
    #[arg(long, default_value_t = 5)]
    pub attempts: usize,
    /// Time to wait for a reply to each ping (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse durations like `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Longest single discovery scan, so a cleared `running` flag is noticed
/// promptly.
const WAIT_SLICE: Duration = Duration::from_millis(500);

/// The explicit device path, or the first discovered one.
///
/// Without `--device`, keeps scanning every `interval` until a board shows
/// up. Returns `None` once `running` is cleared.
pub fn wait_for_path(
    args: &DeviceArgs,
    interval: Duration,
    running: &AtomicBool,
) -> CliResult<Option<PathBuf>> {
    if let Some(path) = &args.device {
        return Ok(Some(path.clone()));
    }
    info!("waiting for a kegboard");
    while running.load(Ordering::SeqCst) {
        let found = wait_for_device(DEFAULT_DEVICE_PATTERNS, interval, Some(WAIT_SLICE))
            .map_err(|err| device_error("device scan failed", err))?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

pub fn open_device(path: &Path, speed: u32) -> CliResult<Device> {
    let mut device = Device::new();
    device
        .open(path, speed)
        .map_err(|err| device_error(&format!("failed to open {}", path.display()), err))?;
    info!(%device, "found kegboard");
    Ok(device)
}

pub fn no_device() -> CliError {
    CliError::new(FAILURE, "no kegboard found")
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration(" ").unwrap_err().code, USAGE);
    }

    #[test]
    fn explicit_device_skips_discovery() {
        let args = DeviceArgs {
            device: Some(PathBuf::from("/dev/ttyUSB7")),
            speed: DEFAULT_SPEED,
        };
        let running = AtomicBool::new(false);
        assert_eq!(
            wait_for_path(&args, Duration::from_millis(1), &running).unwrap(),
            Some(PathBuf::from("/dev/ttyUSB7"))
        );
    }

    #[test]
    fn cleared_flag_stops_waiting() {
        let args = DeviceArgs {
            device: None,
            speed: DEFAULT_SPEED,
        };
        let running = AtomicBool::new(false);
        assert_eq!(
            wait_for_path(&args, Duration::from_millis(1), &running).unwrap(),
            None
        );
    }
}
