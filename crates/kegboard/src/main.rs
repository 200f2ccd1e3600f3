mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "kegboard", version, about = "Kegboard serial protocol tools")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from([
            "kegboard",
            "monitor",
            "--device",
            "/dev/ttyUSB0",
            "--count",
            "3",
        ])
        .expect("monitor args should parse");

        match cli.command {
            Command::Monitor(args) => {
                assert_eq!(args.device.device, Some(PathBuf::from("/dev/ttyUSB0")));
                assert_eq!(args.count, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn tester_defaults() {
        let cli = Cli::try_parse_from(["kegboard", "tester", "--speed", "57600"])
            .expect("tester args should parse");

        match cli.command {
            Command::Tester(args) => {
                assert_eq!(args.device.speed, 57_600);
                assert_eq!(args.outputs, 4);
                assert_eq!(args.interval, "1s");
                assert_eq!(args.cycles, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_info_subcommand() {
        let cli = Cli::try_parse_from([
            "kegboard",
            "--format",
            "json",
            "info",
            "-d",
            "/dev/ttyACM0",
            "--timeout",
            "500ms",
        ])
        .expect("info args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Info(_)));
    }

    #[test]
    fn rejects_non_numeric_speed() {
        let err = Cli::try_parse_from(["kegboard", "info", "--speed", "fast"])
            .expect_err("speed must be numeric");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
