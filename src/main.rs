//! Relay panel CLI
//!
//! A command-line interface (CLI) application for switching and monitoring
//! Modbus RTU relay boards over a serial line.
//!
//! This tool allows users to:
//! - Switch individual relays on or off (Modbus function 0x05, write single coil).
//! - Read back the state of individual relays (Modbus function 0x01, read coils).
//! - Toggle a relay based on its current state.
//! - Poll all configured relays once or continuously.
//! - Supply a custom relay-number-to-coil-address table from a YAML file.
//!
//! The CLI leverages the `relay_panel_lib` crate for protocol definitions and
//! client operations. All Modbus traffic goes through one client instance, so
//! only a single transaction is ever in flight on the half-duplex RTU line.

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use relay_panel_lib::{
    protocol as proto,
    tokio_sync_client::{ClientError, RelayClient},
};
use std::{panic, time::Duration};

mod commandline;
mod config;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Calculates the minimum recommended delay for Modbus RTU based on baud rate.
/// This is typically 3.5 character times.
fn minimum_rtu_delay(baud_rate: &proto::BaudRate) -> Duration {
    // Modbus assumes 11 bits per character for silence-interval calculation
    // (start + 8 data + parity/stop + stop).
    let bits_per_char = 11.0;
    let rate = f64::from(u32::from(baud_rate));

    let char_time_secs = bits_per_char / rate;
    let inter_frame_delay_secs = 3.5 * char_time_secs;
    let delay_micros = (inter_frame_delay_secs * 1_000_000.0) as u64;

    // The Modbus spec fixes the minimum silence at 1.75ms for rates above
    // 19200 baud.
    const MIN_INTER_FRAME_DELAY_MICROS: u64 = 1_750;
    Duration::from_micros(delay_micros.max(MIN_INTER_FRAME_DELAY_MICROS))
}

/// Checks if the user-provided RTU delay is sufficient; if not, uses the calculated minimum.
fn check_rtu_delay(user_delay: Duration, baud_rate: &proto::BaudRate) -> Duration {
    let min_rtu_delay = minimum_rtu_delay(baud_rate);
    if user_delay < min_rtu_delay {
        warn!(
            "User-defined RTU delay of {user_delay:?} is below the recommended minimum of {min_rtu_delay:?} for {baud_rate} baud. Using minimum."
        );
        min_rtu_delay
    } else {
        user_delay
    }
}

/// Maps a failed coil operation to the status line shown to the user.
fn describe_failure(error: &ClientError) -> String {
    match error {
        ClientError::NotConnected => String::from("Not connected to the device"),
        ClientError::InvalidRelay(relay) => {
            format!("Relay {relay} is not in the configured address table")
        }
        ClientError::Protocol(code) => format!("Device rejected the request: {code}"),
        ClientError::Communication(err) => format!("Serial link failure: {err}"),
        ClientError::Unexpected(msg) => format!("Unexpected failure: {msg}"),
    }
}

fn switch_relay(client: &mut RelayClient, relay: proto::Relay, state: proto::CoilState) -> Result<()> {
    client
        .write_relay_state(relay, state)
        .map_err(|error| anyhow!("Cannot switch relay {relay} {state}: {}", describe_failure(&error)))?;
    println!("Relay {relay} switched {state}.");
    Ok(())
}

fn read_relay(client: &mut RelayClient, relay: proto::Relay) -> Result<()> {
    let state = client
        .read_relay_state(relay)
        .map_err(|error| anyhow!("Cannot read relay {relay}: {}", describe_failure(&error)))?;
    println!("Relay {relay}: {state}");
    Ok(())
}

/// Polls every relay in the table once, spacing transactions by `delay`.
///
/// Read failures are rendered per relay instead of aborting the round, so a
/// single unresponsive coil does not hide the state of the others.
fn poll_all(client: &mut RelayClient, delay: Duration) {
    let relays: Vec<proto::Relay> = client.config().relays.iter().map(|(relay, _)| relay).collect();
    let mut first = true;
    for relay in relays {
        if !first {
            std::thread::sleep(delay);
        }
        first = false;
        match client.read_relay_state(relay) {
            Ok(state) => println!("Relay {relay}: {state}"),
            Err(error) => println!("Relay {relay}: {}", describe_failure(&error)),
        }
    }
}

fn toggle_relay(client: &mut RelayClient, relay: proto::Relay, delay: Duration) -> Result<()> {
    let current = client
        .read_relay_state(relay)
        .map_err(|error| anyhow!("Cannot read relay {relay}: {}", describe_failure(&error)))?;
    std::thread::sleep(delay);
    let target = current.inverted();
    client
        .write_relay_state(relay, target)
        .map_err(|error| anyhow!("Cannot switch relay {relay} {target}: {}", describe_failure(&error)))?;
    println!("Relay {relay} toggled {current} -> {target}.");
    Ok(())
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    // Initialize logging as early as possible.
    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "relayctl started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let delay = check_rtu_delay(args.delay, &args.baud_rate);
    let config = config::client_config(&args)?;
    info!(
        "Attempting to connect via RTU to device {} (Address: {}, Baud: {})...",
        config.device, config.address, config.baud_rate
    );

    let mut client = RelayClient::new(config);
    if !client.connect() {
        bail!(
            "Cannot open serial port {} at {} baud",
            args.device,
            args.baud_rate
        );
    }

    match &args.command {
        commandline::CliCommands::On { relay } => {
            info!("Executing: Switch relay {relay} ON");
            switch_relay(&mut client, *relay, proto::CoilState::On)?;
        }
        commandline::CliCommands::Off { relay } => {
            info!("Executing: Switch relay {relay} OFF");
            switch_relay(&mut client, *relay, proto::CoilState::Off)?;
        }
        commandline::CliCommands::Read { relay } => {
            info!("Executing: Read relay {relay}");
            read_relay(&mut client, *relay)?;
        }
        commandline::CliCommands::ReadAll => {
            info!("Executing: Read all configured relays");
            poll_all(&mut client, delay);
        }
        commandline::CliCommands::Toggle { relay } => {
            info!("Executing: Toggle relay {relay}");
            toggle_relay(&mut client, *relay, delay)?;
        }
        commandline::CliCommands::Watch { poll_interval } => {
            info!("Starting watch mode: interval={poll_interval:?}");
            loop {
                debug!("Watch: polling relay states...");
                poll_all(&mut client, delay);
                println!();
                std::thread::sleep(delay.max(*poll_interval));
            }
        }
    }

    client.disconnect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baud(rate: u32) -> proto::BaudRate {
        proto::BaudRate::try_from(rate).unwrap()
    }

    #[test]
    fn test_minimum_rtu_delay_calculation() {
        // 3.5 character times at 11 bits per character: 38.5 / baud.
        assert_eq!(minimum_rtu_delay(&baud(1200)).as_micros(), 32083);
        assert_eq!(minimum_rtu_delay(&baud(2400)).as_micros(), 16041);
        assert_eq!(minimum_rtu_delay(&baud(4800)).as_micros(), 8020);
        assert_eq!(minimum_rtu_delay(&baud(9600)).as_micros(), 4010);
        assert_eq!(minimum_rtu_delay(&baud(19200)).as_micros(), 2005);
        // Above 19200 baud the 1.75ms floor applies.
        assert_eq!(minimum_rtu_delay(&baud(38400)).as_micros(), 1750);
        assert_eq!(minimum_rtu_delay(&baud(115200)).as_micros(), 1750);
    }

    #[test]
    fn test_check_rtu_delay() {
        let br_9600 = baud(9600);
        let min_delay_9600 = minimum_rtu_delay(&br_9600); // Approx 4010 us

        assert_eq!(
            check_rtu_delay(Duration::from_millis(3), &br_9600),
            min_delay_9600
        );
        assert_eq!(
            check_rtu_delay(Duration::from_millis(5), &br_9600),
            Duration::from_millis(5)
        );
        assert_eq!(check_rtu_delay(min_delay_9600, &br_9600), min_delay_9600);
    }

    #[test]
    fn failure_descriptions_name_the_error_kind() {
        assert_eq!(
            describe_failure(&ClientError::NotConnected),
            "Not connected to the device"
        );
        let relay = proto::Relay::try_from(3).unwrap();
        assert_eq!(
            describe_failure(&ClientError::InvalidRelay(relay)),
            "Relay 3 is not in the configured address table"
        );
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        assert!(describe_failure(&ClientError::Communication(io)).starts_with("Serial link failure"));
        assert!(
            describe_failure(&ClientError::Protocol(
                tokio_modbus::ExceptionCode::IllegalDataAddress
            ))
            .starts_with("Device rejected the request")
        );
    }
}
