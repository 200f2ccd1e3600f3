use std::path::PathBuf;
use std::time::{Duration, Instant};

use kegboard_transport::find_devices;
use tracing::debug;

use crate::device::Device;
use crate::error::Result;

/// Return the first matching device path, without waiting.
pub fn get_device(patterns: &[&str]) -> Result<Option<PathBuf>> {
    wait_for_device(patterns, Duration::ZERO, Some(Duration::ZERO))
}

/// Poll for a matching device path every `interval`.
///
/// Gives up after `timeout`, or never when `timeout` is `None`. Paths are
/// checked at least once.
pub fn wait_for_device(
    patterns: &[&str],
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<Option<PathBuf>> {
    wait_with(|| Ok(find_devices(patterns)?), interval, timeout)
}

/// Find a device and open a session on it.
///
/// Returns `None` when no path matches. Failing to open the matched path is
/// an error; other candidates are not tried.
pub fn open_first(patterns: &[&str], speed: u32) -> Result<Option<Device>> {
    open_found(get_device(patterns)?, speed)
}

fn open_found(path: Option<PathBuf>, speed: u32) -> Result<Option<Device>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let mut device = Device::new();
    device.open(&path, speed)?;
    Ok(Some(device))
}

fn wait_with<F>(mut list: F, interval: Duration, timeout: Option<Duration>) -> Result<Option<PathBuf>>
where
    F: FnMut() -> Result<Vec<PathBuf>>,
{
    let deadline = timeout.map(|timeout| Instant::now() + timeout);
    loop {
        if let Some(path) = list()?.into_iter().next() {
            debug!(?path, "found device");
            return Ok(Some(path));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(None);
        }
        std::thread::sleep(interval);
    }
}
