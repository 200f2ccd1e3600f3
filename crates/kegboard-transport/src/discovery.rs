use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, TransportError};

/// Device path patterns checked when no explicit device is given.
///
/// A trailing `*` matches any suffix; anything else must match exactly.
pub const DEFAULT_DEVICE_PATTERNS: &[&str] = &[
    "/dev/ttyUSB*",
    "/dev/ttyACM*",
    "/dev/cu.usbserial*",
    "/dev/tty.usbmodem*",
];

/// List serial ports whose names match any of `patterns`.
///
/// Results are grouped in pattern order, sorted within each pattern.
pub fn find_devices(patterns: &[&str]) -> Result<Vec<PathBuf>> {
    let ports = serialport::available_ports().map_err(TransportError::Discovery)?;
    let names: Vec<String> = ports.into_iter().map(|port| port.port_name).collect();
    let found = select_matching(&names, patterns);
    debug!(candidates = names.len(), matched = found.len(), "scanned serial ports");
    Ok(found)
}

/// Returns true if `name` matches a discovery pattern.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

fn select_matching(names: &[String], patterns: &[&str]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let mut matched: Vec<&String> = names
            .iter()
            .filter(|name| matches_pattern(pattern, name))
            .collect();
        matched.sort();
        for name in matched {
            let path = PathBuf::from(name);
            if !out.contains(&path) {
                out.push(path);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_prefix() {
        assert!(matches_pattern("/dev/ttyUSB*", "/dev/ttyUSB0"));
        assert!(matches_pattern("/dev/ttyUSB*", "/dev/ttyUSB"));
        assert!(!matches_pattern("/dev/ttyUSB*", "/dev/ttyACM0"));
    }

    #[test]
    fn plain_pattern_matches_exactly() {
        assert!(matches_pattern("/dev/ttyS0", "/dev/ttyS0"));
        assert!(!matches_pattern("/dev/ttyS0", "/dev/ttyS01"));
    }

    #[test]
    fn selection_keeps_pattern_order() {
        let names = vec![
            "/dev/ttyACM0".to_string(),
            "/dev/ttyUSB1".to_string(),
            "/dev/ttyS0".to_string(),
            "/dev/ttyUSB0".to_string(),
        ];
        let found = select_matching(&names, DEFAULT_DEVICE_PATTERNS);
        assert_eq!(
            found,
            vec![
                PathBuf::from("/dev/ttyUSB0"),
                PathBuf::from("/dev/ttyUSB1"),
                PathBuf::from("/dev/ttyACM0"),
            ]
        );
    }

    #[test]
    fn overlapping_patterns_do_not_duplicate() {
        let names = vec!["/dev/ttyUSB0".to_string()];
        let found = select_matching(&names, &["/dev/tty*", "/dev/ttyUSB*"]);
        assert_eq!(found, vec![PathBuf::from("/dev/ttyUSB0")]);
    }
}
