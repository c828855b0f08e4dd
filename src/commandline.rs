use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use relay_panel_lib::protocol as proto;
use std::path::PathBuf;
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1") // Common default for Windows, though may vary.
    } else {
        String::from("/dev/ttyUSB0") // Common default for USB-to-serial adapters on Linux.
    }
}

fn parse_relay(s: &str) -> Result<proto::Relay, String> {
    let relay_num =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid relay number format: {e}"))?;
    proto::Relay::try_from(relay_num).map_err(|e| e.to_string())
}

fn parse_address(s: &str) -> Result<proto::Address, String> {
    let address_val =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid address format: {e}"))?;
    proto::Address::try_from(address_val).map_err(|e| e.to_string())
}

fn parse_baud_rate(s: &str) -> Result<proto::BaudRate, String> {
    let rate_val = s
        .parse::<u32>()
        .map_err(|e| format!("Invalid baud rate number format: {e}"))?;
    proto::BaudRate::try_from(rate_val).map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Switch one relay on.
    On {
        /// Logical relay number as printed on the board (1-based).
        /// Can be specified in decimal or hexadecimal (e.g., "1" or "0x1").
        #[arg(value_parser = parse_relay, verbatim_doc_comment)]
        relay: proto::Relay,
    },

    /// Switch one relay off.
    Off {
        /// Logical relay number as printed on the board (1-based).
        #[arg(value_parser = parse_relay)]
        relay: proto::Relay,
    },

    /// Read and display the current state of one relay.
    Read {
        /// Logical relay number as printed on the board (1-based).
        #[arg(value_parser = parse_relay)]
        relay: proto::Relay,
    },

    /// Read and display the state of every relay in the address table.
    /// Transactions are spaced by the configured RTU delay.
    #[clap(verbatim_doc_comment)]
    ReadAll,

    /// Toggle one relay: read its current state, then write the opposite.
    Toggle {
        /// Logical relay number as printed on the board (1-based).
        #[arg(value_parser = parse_relay)]
        relay: proto::Relay,
    },

    /// Continuously poll all relays and print their states.
    /// All polling goes through the single serial connection, one Modbus
    /// transaction at a time.
    #[clap(verbatim_doc_comment)]
    Watch {
        /// Interval between poll rounds (e.g., "2s", "500ms").
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "2s")]
        poll_interval: Duration,
    },
}

const fn about_text() -> &'static str {
    "Relay panel CLI - Switch and monitor Modbus RTU relay boards, coil by coil."
}

#[derive(Parser, Debug)]
#[command(name="relayctl", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Serial port device name.
    /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
    #[arg(short, long, default_value_t = default_device_name())]
    pub device: String,

    /// Baud rate for serial communication.
    /// Must match the board's configured baud rate.
    /// Supported values: 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200.
    #[arg(long, default_value_t = proto::BaudRate::default(), value_parser = parse_baud_rate, verbatim_doc_comment)]
    pub baud_rate: proto::BaudRate,

    /// The Modbus RTU device address of the relay board.
    /// Must be unique on the RS485 bus, ranging from 1 to 247.
    /// Can be specified in decimal or hexadecimal (e.g., "1" or "0x01").
    #[arg(short, long, default_value_t = proto::Address::default(), value_parser = parse_address, verbatim_doc_comment)]
    pub address: proto::Address,

    /// Modbus I/O timeout for read/write operations.
    /// Examples: "3s", "500ms".
    #[arg(long, default_value = "3s", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// Minimum delay between multiple Modbus commands sent to the same device.
    /// Important for Modbus RTU, especially with USB-to-RS485 converters that need time
    /// to switch between transmitting (TX) and receiving (RX) modes.
    /// Examples: "50ms", "100ms".
    #[arg(long, default_value = "50ms", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub delay: Duration,

    /// YAML file mapping logical relay numbers to coil addresses.
    /// Defaults to the contiguous factory layout: 8 relays on addresses 0-7.
    /// Example file content: "{1: 0x0000, 2: 0x0001}".
    #[arg(long, verbatim_doc_comment)]
    pub relay_map: Option<PathBuf>,

    /// The command to run against the board.
    #[command(subcommand)]
    pub command: CliCommands,
}
