use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kegboard_device::Device;
use tracing::info;

use crate::cmd::{install_ctrlc_handler, open_device, parse_duration, wait_for_path, TesterArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

const SCAN_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: TesterArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let Some(path) = wait_for_path(&args.device, SCAN_INTERVAL, &running)? else {
        return Ok(SUCCESS);
    };
    let mut device = open_device(&path, args.device.speed)?;

    let result = cycle_outputs(&mut device, &args, interval, format, &running);
    device.close_quietly();
    result.map_err(|err| device_error("tester failed", err))?;

    Ok(SUCCESS)
}

/// Switch each output on, then off, draining replies after every command.
fn cycle_outputs(
    device: &mut Device,
    args: &TesterArgs,
    interval: Duration,
    format: OutputFormat,
    running: &AtomicBool,
) -> kegboard_device::Result<()> {
    let mut cycles = 0usize;
    while running.load(Ordering::SeqCst) && args.cycles.is_none_or(|max| cycles < max) {
        for output in 0..args.outputs {
            for enabled in [true, false] {
                if !running.load(Ordering::SeqCst) {
                    return Ok(());
                }
                info!(output, enabled, "sending output command");
                device.set_output(output, enabled)?;
                for message in device.drain()? {
                    info!(%message, "reply");
                    print_message(&message, format);
                }
                std::thread::sleep(interval);
            }
        }
        cycles += 1;
    }
    Ok(())
}
