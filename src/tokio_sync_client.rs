//! Stateful synchronous client for a Modbus RTU relay board.
//!
//! [`RelayClient`] owns the serial transport and a connection state, and maps
//! logical relay numbers to coil addresses through the configured
//! [`proto::RelayAddressTable`]. Every failure is returned as a
//! [`ClientError`] value; nothing panics across this boundary, so a UI or
//! CLI caller can always render a status message.
//!
//! The client performs no retries and logs nothing itself. Retry policy and
//! logging belong to the caller, which knows the acceptable latency and
//! whether repeating a write to a physical relay is safe.
//!
//! # Examples
//!
//! ```no_run
//! use relay_panel_lib::{
//!     protocol as proto,
//!     tokio_sync_client::{ClientConfig, RelayClient},
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RelayClient::new(ClientConfig::default());
//!     if !client.connect() {
//!         eprintln!("Cannot open serial port");
//!         return Ok(());
//!     }
//!
//!     let relay = proto::Relay::try_from(1)?;
//!     client.write_relay_state(relay, proto::CoilState::On)?;
//!     let state = client.read_relay_state(relay)?;
//!     println!("Relay {relay} is {state}");
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

use crate::{protocol as proto, tokio_common, tokio_sync};
use std::time::Duration;
use tokio_modbus::Slave;

/// Connection parameters for one relay board, immutable for the lifetime of
/// the client.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ClientConfig {
    /// Serial port device name, e.g. `/dev/ttyUSB0` or `COM3`.
    #[cfg_attr(feature = "serde", serde(default = "default_device"))]
    pub device: String,

    /// Serial bit rate; must match the board's configured rate.
    #[cfg_attr(feature = "serde", serde(default))]
    pub baud_rate: proto::BaudRate,

    /// Maximum wait per Modbus transaction.
    #[cfg_attr(
        feature = "serde",
        serde(default = "default_timeout", with = "humantime_serde")
    )]
    pub timeout: Duration,

    /// Modbus device address (slave id) of the board.
    #[cfg_attr(feature = "serde", serde(default))]
    pub address: proto::Address,

    /// Mapping from logical relay number to coil address.
    #[cfg_attr(feature = "serde", serde(default))]
    pub relays: proto::RelayAddressTable,
}

fn default_device() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(3)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: proto::BaudRate::default(),
            timeout: default_timeout(),
            address: proto::Address::default(),
            relays: proto::RelayAddressTable::default(),
        }
    }
}

/// The outcome classification of a failed coil operation.
///
/// Callers can match exhaustively and turn each kind into a status message.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// A coil operation was attempted while the client is disconnected.
    #[error("not connected to the device")]
    NotConnected,

    /// The relay number is not present in the configured address table.
    #[error("invalid relay number: {0}")]
    InvalidRelay(proto::Relay),

    /// The device returned a well-formed Modbus exception response.
    #[error("Modbus exception: {0}")]
    Protocol(tokio_modbus::ExceptionCode),

    /// Transport-level failure: timeout, broken link, framing or CRC error.
    #[error("communication error: {0}")]
    Communication(std::io::Error),

    /// Safety net for failures not classifiable above.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<tokio_common::Error> for ClientError {
    fn from(err: tokio_common::Error) -> Self {
        match err {
            tokio_common::Error::TokioExceptionError(code) => ClientError::Protocol(code),
            tokio_common::Error::TokioError(tokio_modbus::Error::Transport(err)) => {
                ClientError::Communication(err)
            }
            other => ClientError::Unexpected(other.to_string()),
        }
    }
}

/// Synchronous Modbus RTU client managing one session with a relay board.
///
/// The client is either `Closed` (no transport) or `Open` (serial port held).
/// Coil operations require the `Open` state; in `Closed` they report
/// [`ClientError::NotConnected`] instead of failing silently or panicking.
/// A failed transaction leaves the session `Open`; only [`disconnect`]
/// (or dropping the client) releases the port.
///
/// All access to the serial line goes through `&mut self`, so one client
/// serializes its transactions by construction. Modbus RTU is a strict
/// master/slave protocol over a half-duplex line; callers that poll from
/// several places must share a single client behind one exclusion point.
///
/// [`disconnect`]: RelayClient::disconnect
pub struct RelayClient {
    config: ClientConfig,
    ctx: Option<tokio_modbus::client::sync::Context>,
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("config", &self.config)
            .field("connected", &self.ctx.is_some())
            .finish()
    }
}

impl RelayClient {
    /// Creates a new client in the `Closed` state.
    pub fn new(config: ClientConfig) -> Self {
        Self { config, ctx: None }
    }

    /// The configuration this client was constructed with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Opens the configured serial transport.
    ///
    /// Idempotent: if already connected, returns `true` without touching the
    /// port. Any transport-level failure (port missing, permission denied,
    /// port in use) yields `false`; the caller decides what to log or show.
    pub fn connect(&mut self) -> bool {
        if self.ctx.is_some() {
            return true;
        }
        let builder = tokio_common::serial_port_builder(&self.config.device, &self.config.baud_rate);
        match tokio_modbus::client::sync::rtu::connect_slave(&builder, Slave(*self.config.address))
        {
            Ok(mut ctx) => {
                ctx.set_timeout(self.config.timeout);
                self.ctx = Some(ctx);
                true
            }
            Err(_) => false,
        }
    }

    /// Closes the serial transport if it is open.
    ///
    /// Idempotent and safe to call at shutdown even after failed operations.
    /// Dropping the client has the same effect.
    pub fn disconnect(&mut self) {
        self.ctx = None;
    }

    /// Whether the serial transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    /// Writes the requested state to one relay (Modbus function 0x05).
    ///
    /// Exactly one transaction per call; no retries.
    ///
    /// # Errors
    ///
    /// * [`ClientError::InvalidRelay`] if the relay is not in the address
    ///   table. Checked before any transport I/O, regardless of connection
    ///   state.
    /// * [`ClientError::NotConnected`] if the client is `Closed`.
    /// * [`ClientError::Protocol`], [`ClientError::Communication`],
    ///   [`ClientError::Unexpected`] for device and transport failures.
    pub fn write_relay_state(
        &mut self,
        relay: proto::Relay,
        state: proto::CoilState,
    ) -> Result<(), ClientError> {
        let address = self.coil_address(relay)?;
        let ctx = self.ctx.as_mut().ok_or(ClientError::NotConnected)?;
        tokio_sync::RelayBoard::set_coil(ctx, address, state).map_err(ClientError::from)
    }

    /// Reads the current state of one relay (Modbus function 0x01).
    ///
    /// Validation and error taxonomy match [`RelayClient::write_relay_state`];
    /// on success the result carries bit 0 of the read response.
    pub fn read_relay_state(&mut self, relay: proto::Relay) -> Result<proto::CoilState, ClientError> {
        let address = self.coil_address(relay)?;
        let ctx = self.ctx.as_mut().ok_or(ClientError::NotConnected)?;
        tokio_sync::RelayBoard::read_coil(ctx, address).map_err(ClientError::from)
    }

    fn coil_address(&self, relay: proto::Relay) -> Result<u16, ClientError> {
        self.config
            .relays
            .coil_address(relay)
            .ok_or(ClientError::InvalidRelay(relay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn relay(number: u8) -> proto::Relay {
        proto::Relay::try_from(number).unwrap()
    }

    fn closed_client() -> RelayClient {
        RelayClient::new(ClientConfig {
            // A device node that cannot exist, so an accidental connect fails.
            device: String::from("/dev/relayctl-test-no-such-port"),
            ..ClientConfig::default()
        })
    }

    #[test]
    fn operations_while_disconnected_report_not_connected() {
        let mut client = closed_client();
        assert!(!client.is_connected());
        assert_matches!(
            client.write_relay_state(relay(1), proto::CoilState::On),
            Err(ClientError::NotConnected)
        );
        assert_matches!(
            client.read_relay_state(relay(1)),
            Err(ClientError::NotConnected)
        );
    }

    #[test]
    fn unknown_relay_is_rejected_without_io() {
        let mut client = RelayClient::new(ClientConfig {
            relays: proto::RelayAddressTable::contiguous(2),
            ..ClientConfig::default()
        });
        // No transport exists at all, so a passing test proves the relay
        // number is validated before any I/O is attempted.
        assert_matches!(
            client.write_relay_state(relay(3), proto::CoilState::On),
            Err(ClientError::InvalidRelay(r)) if *r == 3
        );
        assert_matches!(
            client.read_relay_state(relay(3)),
            Err(ClientError::InvalidRelay(r)) if *r == 3
        );
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut client = closed_client();
        client.disconnect();
        client.disconnect();
        assert!(!client.is_connected());
    }

    #[test]
    fn connect_to_missing_port_fails() {
        let mut client = closed_client();
        assert!(!client.connect());
        assert!(!client.is_connected());
        // A second attempt behaves the same; the client stays `Closed`.
        assert!(!client.connect());
        assert!(!client.is_connected());
    }

    #[test]
    fn device_exception_maps_to_protocol_error() {
        let err = tokio_common::Error::TokioExceptionError(
            tokio_modbus::ExceptionCode::IllegalDataAddress,
        );
        assert_matches!(
            ClientError::from(err),
            ClientError::Protocol(tokio_modbus::ExceptionCode::IllegalDataAddress)
        );
    }

    #[test]
    fn transport_timeout_maps_to_communication_error() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "no response from device");
        let err = tokio_common::Error::TokioError(tokio_modbus::Error::Transport(io));
        assert_matches!(
            ClientError::from(err),
            ClientError::Communication(e) if e.kind() == std::io::ErrorKind::TimedOut
        );
    }

    #[test]
    fn decode_error_maps_to_unexpected() {
        let err = tokio_common::Error::ProtocolError(proto::Error::EmptyCoilResponse);
        assert_matches!(ClientError::from(err), ClientError::Unexpected(..));
    }

    #[test]
    fn default_config_matches_board_factory_settings() {
        let config = ClientConfig::default();
        assert_eq!(*config.baud_rate, 9600);
        assert_eq!(*config.address, 1);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.relays.len(), 8);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_deserializes_from_yaml() {
        let yaml = r#"
device: /dev/ttyUSB1
baud_rate: 19200
timeout: 1s
address: 2
relays:
  1: 0x0000
  2: 0x0001
"#;
        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.device, "/dev/ttyUSB1");
        assert_eq!(*config.baud_rate, 19200);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(*config.address, 2);
        assert_eq!(config.relays.coil_address(relay(2)), Some(1));
        assert_eq!(config.relays.coil_address(relay(3)), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_rejects_invalid_values() {
        assert!(serde_yaml::from_str::<ClientConfig>("baud_rate: 1234").is_err());
        assert!(serde_yaml::from_str::<ClientConfig>("address: 0").is_err());
        assert!(serde_yaml::from_str::<ClientConfig>("relays: {}").is_err());
    }
}
