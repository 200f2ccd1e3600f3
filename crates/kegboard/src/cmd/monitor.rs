use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kegboard_device::{Device, DEFAULT_POLL_INTERVAL};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, open_device, parse_duration, wait_for_path, MonitorArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// Upper bound on one blocking read, so an interrupt is noticed promptly.
const READ_SLICE: Duration = Duration::from_millis(500);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    if args.count == Some(0) {
        return Ok(SUCCESS);
    }
    let scan_interval = parse_duration(&args.scan_interval)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let Some(path) = wait_for_path(&args.device, scan_interval, &running)? else {
            break;
        };
        let mut device = match open_device(&path, args.device.speed) {
            Ok(device) => device,
            Err(err) if args.device.device.is_some() => return Err(err),
            Err(err) => {
                warn!(%err, "could not open board, waiting again");
                std::thread::sleep(scan_interval);
                continue;
            }
        };
        info!("listening to board");

        let result = listen(&mut device, &args, format, &running, &mut printed);
        device.close_quietly();

        match result {
            Ok(()) => break,
            Err(err) => {
                warn!(%err, "error, closing board");
                std::thread::sleep(scan_interval);
            }
        }
    }

    Ok(SUCCESS)
}

/// Print messages until interrupted or `--count` is reached.
fn listen(
    device: &mut Device,
    args: &MonitorArgs,
    format: OutputFormat,
    running: &AtomicBool,
    printed: &mut usize,
) -> kegboard_device::Result<()> {
    while running.load(Ordering::SeqCst) {
        let Some(message) = device.read(Some(READ_SLICE), DEFAULT_POLL_INTERVAL)? else {
            continue;
        };
        print_message(&message, format);
        *printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| *printed >= count) {
            running.store(false, Ordering::SeqCst);
        }
    }
    Ok(())
}
