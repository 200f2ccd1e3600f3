use std::time::Duration;

use kegboard_device::{open_first, HandshakeConfig};
use kegboard_message::Hello;
use kegboard_transport::DEFAULT_DEVICE_PATTERNS;
use serde::Serialize;
use tracing::debug;

use crate::cmd::{no_device, open_device, parse_duration, InfoArgs};
use crate::exit::{device_error, message_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct InfoOutput {
    device: String,
    firmware_version: Option<u16>,
    serial_number: Option<String>,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let reply_timeout = parse_duration(&args.timeout)?;
    let mut device = match &args.device.device {
        Some(path) => open_device(path, args.device.speed)?,
        None => open_first(DEFAULT_DEVICE_PATTERNS, args.device.speed)
            .map_err(|err| device_error("failed to open kegboard", err))?
            .ok_or_else(no_device)?,
    };
    let path = device
        .path()
        .map_or_else(|| device.to_string(), |path| path.display().to_string());
    debug!(%device, "pinging kegboard");

    let config = handshake_config(args.attempts, reply_timeout);
    let result = device.handshake_with_config(&config);
    device.close_quietly();

    let hello = result
        .map_err(|err| device_error("handshake failed", err))?
        .ok_or_else(|| {
            CliError::new(
                TIMEOUT,
                format!("gave up pinging kegboard after {} attempts", args.attempts),
            )
        })?;
    let hello = Hello::try_from(&hello).map_err(|err| message_error("bad hello", err))?;

    let out = InfoOutput {
        device: path,
        firmware_version: hello.firmware_version,
        serial_number: hello.serial_number,
    };
    print_info(&out, format);
    Ok(SUCCESS)
}

fn handshake_config(attempts: usize, reply_timeout: Duration) -> HandshakeConfig {
    HandshakeConfig {
        max_attempts: attempts,
        reply_timeout,
        poll_interval: reply_timeout.min(HandshakeConfig::default().poll_interval),
    }
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    let firmware = out
        .firmware_version
        .map_or_else(|| "unknown".to_string(), |v| v.to_string());
    let serial = out.serial_number.as_deref().unwrap_or("unknown");

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Kegboard:");
            println!("  Device:           {}", out.device);
            println!("  Firmware version: {firmware}");
            println!("  Serial number:    {serial}");
        }
        OutputFormat::Raw => {
            println!("{}: firmware_version={firmware} serial_number={serial}", out.device);
        }
    }
}
