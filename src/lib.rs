//! A library for controlling Modbus RTU relay boards, coil by coil.
//!
//! This crate provides two ways to interact with a relay board:
//!
//! 1.  **High-Level, Stateful Client**: [`tokio_sync_client::RelayClient`]
//!     manages the serial connection lifecycle, maps logical relay numbers
//!     to coil addresses and classifies every failure into an exhaustive
//!     error taxonomy. This is the recommended approach for most users.
//!
//! 2.  **Low-Level, Stateless Functions**: [`tokio_sync::RelayBoard`] maps
//!     directly to the two Modbus coil commands (functions 0x01 and 0x05)
//!     and leaves management of the Modbus context to the caller.
//!
//! ## Features
//!
//! - **Strongly-Typed API**: Range-validated protocol types (`Relay`,
//!   `Address`, `BaudRate`, `CoilState`, `RelayAddressTable`).
//! - **Errors as values**: Coil operations never panic across the client
//!   boundary; callers match on [`tokio_sync_client::ClientError`] and
//!   render a status message per kind.
//! - **Single transaction in flight**: Modbus RTU is a master/slave protocol
//!   over a half-duplex line; the client serializes access by construction.
//!
//! ## Quick Start
//!
//! ```no_run
//! use relay_panel_lib::{
//!     protocol as proto,
//!     tokio_sync_client::{ClientConfig, RelayClient},
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Factory defaults: /dev/ttyUSB0, 9600 baud, slave 1, 8 relays.
//!     let mut client = RelayClient::new(ClientConfig::default());
//!     assert!(client.connect(), "serial port could not be opened");
//!
//!     let relay = proto::Relay::try_from(1)?;
//!     client.write_relay_state(relay, proto::CoilState::On)?;
//!     println!("Relay {relay} is {}", client.read_relay_state(relay)?);
//!
//!     Ok(())
//! }
//! ```

pub mod protocol;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-rtu-sync")))]
#[cfg(feature = "tokio-rtu-sync")]
pub mod tokio_common;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-rtu-sync")))]
#[cfg(feature = "tokio-rtu-sync")]
pub mod tokio_sync;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-rtu-sync")))]
#[cfg(feature = "tokio-rtu-sync")]
pub mod tokio_sync_client;
