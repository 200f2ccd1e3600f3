use std::time::Duration;

use kegboard_message::{Message, MessageKind};
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::Result;

/// Configuration for the ping/hello handshake.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Pings sent before giving up. Default: 5.
    pub max_attempts: usize,
    /// How long each round waits for the first reply. Default: 1s.
    pub reply_timeout: Duration,
    /// Poll interval while waiting for a reply. Default: 100ms.
    pub poll_interval: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            reply_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Device {
    /// Ping the board until it answers with a hello report.
    ///
    /// Sends at most `max_attempts` pings. Returns `None` when none of them
    /// produced a hello.
    pub fn handshake(&mut self, max_attempts: usize) -> Result<Option<Message>> {
        let config = HandshakeConfig {
            max_attempts,
            ..HandshakeConfig::default()
        };
        self.handshake_with_config(&config)
    }

    /// Perform the handshake with explicit configuration.
    ///
    /// Messages already buffered are discarded first. Each round sends one
    /// ping, waits up to `reply_timeout` for a reply, then takes whatever
    /// else is immediately available. Other reports in a round are ignored.
    pub fn handshake_with_config(&mut self, config: &HandshakeConfig) -> Result<Option<Message>> {
        let stale = self.drain()?;
        if !stale.is_empty() {
            debug!(count = stale.len(), "discarded stale messages before handshake");
        }

        for attempt in 1..=config.max_attempts {
            debug!(attempt, max_attempts = config.max_attempts, "sending ping");
            self.ping()?;

            let mut replies: Vec<Message> = self
                .read(Some(config.reply_timeout), config.poll_interval)?
                .into_iter()
                .collect();
            replies.extend(self.drain()?);

            if let Some(hello) = replies
                .into_iter()
                .find(|message| message.is(MessageKind::Hello))
            {
                info!(attempt, %hello, "handshake complete");
                return Ok(Some(hello));
            }
        }

        warn!(attempts = config.max_attempts, "no hello from device");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use kegboard_message::{Hello, MessageKind};
    use kegboard_transport::{FakeTransport, TransportError};

    use super::*;
    use crate::error::DeviceError;

    fn fast(max_attempts: usize) -> HandshakeConfig {
        HandshakeConfig {
            max_attempts,
            reply_timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn hello_wire(serial: &str) -> Vec<u8> {
        Hello {
            firmware_version: Some(18),
            serial_number: Some(serial.to_string()),
        }
        .to_message()
        .unwrap()
        .to_frame_bytes()
        .unwrap()
        .to_vec()
    }

    /// A board that answers the `answer_on`-th ping, or never when `None`.
    fn board(answer_on: Option<usize>) -> FakeTransport {
        let hello = hello_wire("KB-0042");
        let mut pings = 0;
        FakeTransport::new().with_responder(move |_written| {
            pings += 1;
            if Some(pings) == answer_on {
                hello.clone()
            } else {
                Vec::new()
            }
        })
    }

    fn pings_sent(fake: &FakeTransport) -> usize {
        let ping = Message::ping().to_frame_bytes().unwrap().to_vec();
        fake.writes().iter().filter(|w| **w == ping).count()
    }

    #[test]
    fn hello_after_third_ping() {
        let fake = board(Some(3));
        let mut device = Device::new();
        device.attach(fake.clone()).unwrap();

        let hello = device.handshake_with_config(&fast(5)).unwrap().unwrap();

        assert!(hello.is(MessageKind::Hello));
        let view = Hello::try_from(&hello).unwrap();
        assert_eq!(view.serial_number.as_deref(), Some("KB-0042"));
        assert_eq!(pings_sent(&fake), 3);
    }

    #[test]
    fn silent_board_exhausts_attempts() {
        let fake = board(None);
        let mut device = Device::new();
        device.attach(fake.clone()).unwrap();

        assert!(device.handshake_with_config(&fast(3)).unwrap().is_none());
        assert_eq!(pings_sent(&fake), 3);
        assert_eq!(fake.writes().len(), 3);
    }

    #[test]
    fn stale_hello_does_not_count() {
        let fake = board(None);
        fake.push_inbound(&hello_wire("stale"));
        let mut device = Device::new();
        device.attach(fake.clone()).unwrap();

        assert!(device.handshake_with_config(&fast(2)).unwrap().is_none());
        assert_eq!(pings_sent(&fake), 2);
    }

    #[test]
    fn other_reports_in_a_round_are_skipped() {
        let meter = Message::of(MessageKind::MeterStatus)
            .with("meter_reading", 7u32)
            .unwrap()
            .to_frame_bytes()
            .unwrap()
            .to_vec();
        let hello = hello_wire("KB-1");
        let fake = FakeTransport::new().with_responder(move |_written| {
            let mut reply = meter.clone();
            reply.extend_from_slice(&hello);
            reply
        });
        let mut device = Device::new();
        device.attach(fake.clone()).unwrap();

        let hello = device.handshake_with_config(&fast(5)).unwrap().unwrap();
        assert!(hello.is(MessageKind::Hello));
        assert_eq!(pings_sent(&fake), 1);
    }

    #[test]
    fn zero_attempts_sends_nothing() {
        let fake = board(Some(1));
        let mut device = Device::new();
        device.attach(fake.clone()).unwrap();

        assert!(device.handshake(0).unwrap().is_none());
        assert!(fake.writes().is_empty());
    }

    #[test]
    fn read_failure_aborts_handshake() {
        let fake = board(Some(1));
        let mut device = Device::new();
        device.attach(fake.clone()).unwrap();
        fake.fail_next_read(std::io::ErrorKind::BrokenPipe);

        let err = device.handshake_with_config(&fast(5)).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Transport(TransportError::Io(ref io))
                if io.kind() == std::io::ErrorKind::BrokenPipe
        ));
        assert!(device.is_open());
        assert!(fake.writes().is_empty());

        let hello = device.handshake_with_config(&fast(5)).unwrap();
        assert!(hello.is_some());
    }

    #[test]
    fn handshake_requires_open() {
        let mut device = Device::new();
        assert!(matches!(device.handshake(1), Err(DeviceError::NotOpen)));
    }
}
