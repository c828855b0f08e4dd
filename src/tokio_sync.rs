//! Synchronous `tokio-modbus` coil transactions for Modbus relay boards.
//!
//! This module provides stateless functions that directly map to the two
//! Modbus commands relay boards expose per channel: write single coil
//! (function 0x05) and read coils (function 0x01). The caller owns the
//! `tokio_modbus::client::sync::Context`; the stateful connection wrapper
//! lives in [`crate::tokio_sync_client`].
//!
//! # Examples
//!
//! ```no_run
//! use relay_panel_lib::{protocol as proto, tokio_sync::RelayBoard};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = relay_panel_lib::tokio_common::serial_port_builder(
//!         "/dev/ttyUSB0", // Or "COM3" on Windows, etc.
//!         &proto::BaudRate::default(),
//!     );
//!     let slave = tokio_modbus::Slave(*proto::Address::default());
//!     let mut modbus_ctx = tokio_modbus::client::sync::rtu::connect_slave(&builder, slave)?;
//!     modbus_ctx.set_timeout(Duration::from_secs(3));
//!
//!     // Switch the coil at address 0 (relay 1 on a contiguous board) on.
//!     RelayBoard::set_coil(&mut modbus_ctx, 0, proto::CoilState::On)?;
//!     let state = RelayBoard::read_coil(&mut modbus_ctx, 0)?;
//!     println!("Coil 0 is now {state}");
//!
//!     Ok(())
//! }
//! ```

use crate::{protocol as proto, tokio_common::Result};
use tokio_modbus::prelude::{SyncReader, SyncWriter};

/// Stateless synchronous access to the coils of a Modbus relay board.
///
/// All methods block the current thread for the duration of one Modbus
/// transaction, bounded by the timeout configured on the context.
#[derive(Debug)]
pub struct RelayBoard;

impl RelayBoard {
    /// Helper function to map tokio result to our result.
    fn map_tokio_result<T>(result: tokio_modbus::Result<T>) -> Result<T> {
        match result {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(err.into()), // Modbus exception
            Err(err) => Err(err.into()),     // IO error
        }
    }

    /// Writes one coil with Modbus function 0x05 (write single coil).
    ///
    /// `tokio-modbus` encodes the requested state as 0xFF00 for on and
    /// 0x0000 for off, per the Modbus specification.
    ///
    /// # Errors
    ///
    /// * [`crate::tokio_common::Error::TokioExceptionError`] if the device
    ///   answers with a Modbus exception (illegal data address, ...).
    /// * [`crate::tokio_common::Error::TokioError`] on transport failures
    ///   such as a timeout or a broken serial link.
    pub fn set_coil(
        ctx: &mut tokio_modbus::client::sync::Context,
        address: u16,
        state: proto::CoilState,
    ) -> Result<()> {
        Self::map_tokio_result(ctx.write_single_coil(address, state.into()))
    }

    /// Reads one coil with Modbus function 0x01 (read coils), quantity 1.
    ///
    /// Bit 0 of the response carries the observed state.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`RelayBoard::set_coil`]; additionally
    /// [`proto::Error::EmptyCoilResponse`] if the device acknowledges the
    /// read but returns no coil data.
    pub fn read_coil(
        ctx: &mut tokio_modbus::client::sync::Context,
        address: u16,
    ) -> Result<proto::CoilState> {
        let bits = Self::map_tokio_result(ctx.read_coils(address, 1))?;
        let bit = bits
            .first()
            .copied()
            .ok_or(proto::Error::EmptyCoilResponse)?;
        Ok(proto::CoilState::from(bit))
    }
}
