//! Protocol-level types for Modbus RTU relay boards.
//!
//! Every value that crosses the wire or comes from configuration is wrapped
//! in a validating newtype: construction via `TryFrom` rejects out-of-range
//! input once, so the client and CLI layers never re-check ranges.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Validation errors for protocol values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Logical relay numbers are 1-based.
    #[error("relay number {0} is out of range (must be 1 or greater)")]
    RelayOutOfRange(u8),

    /// Modbus device addresses are limited to 1-247.
    #[error(
        "device address {0} is out of range ({min}-{max})",
        min = Address::MIN,
        max = Address::MAX
    )]
    AddressOutOfRange(u8),

    /// Only the standard serial bit rates are accepted.
    #[error("unsupported baud rate: {0}")]
    BaudRateUnsupported(u32),

    /// A coil state string that is neither on nor off.
    #[error("invalid coil state {0:?} (expected \"on\" or \"off\")")]
    InvalidCoilState(String),

    /// A relay address table from configuration must map at least one relay.
    #[error("relay address table must not be empty")]
    EmptyAddressTable,

    /// The device acknowledged a coil read but returned no coil data.
    #[error("device returned an empty coil response")]
    EmptyCoilResponse,
}

/// A logical relay number as printed on the board, starting at 1.
///
/// Membership in the configured [`RelayAddressTable`] is checked separately;
/// this type only rules out 0, which no board uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "u8")
)]
pub struct Relay(u8);

impl Relay {
    /// The lowest valid relay number.
    pub const MIN: u8 = 1;
}

impl TryFrom<u8> for Relay {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value >= Self::MIN {
            Ok(Relay(value))
        } else {
            Err(Error::RelayOutOfRange(value))
        }
    }
}

impl std::ops::Deref for Relay {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Relay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two-valued state of one relay coil.
///
/// On the wire a coil is a single bit; `tokio-modbus` encodes the write as
/// 0xFF00 for on and 0x0000 for off, as the Modbus specification requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoilState {
    Off,
    On,
}

impl CoilState {
    pub fn is_on(&self) -> bool {
        matches!(self, CoilState::On)
    }

    /// The opposite state, used by the CLI toggle command.
    pub fn inverted(&self) -> Self {
        match self {
            CoilState::On => CoilState::Off,
            CoilState::Off => CoilState::On,
        }
    }
}

impl From<bool> for CoilState {
    fn from(value: bool) -> Self {
        if value { CoilState::On } else { CoilState::Off }
    }
}

impl From<CoilState> for bool {
    fn from(value: CoilState) -> Self {
        value.is_on()
    }
}

impl FromStr for CoilState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "1" | "true" => Ok(CoilState::On),
            "off" | "0" | "false" => Ok(CoilState::Off),
            _ => Err(Error::InvalidCoilState(s.to_string())),
        }
    }
}

impl fmt::Display for CoilState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoilState::On => write!(f, "ON"),
            CoilState::Off => write!(f, "OFF"),
        }
    }
}

/// The Modbus RTU device address (slave id) of the relay board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "u8")
)]
pub struct Address(u8);

impl Address {
    /// The lowest assignable device address.
    pub const MIN: u8 = 1;
    /// The highest assignable device address.
    pub const MAX: u8 = 247;
}

impl Default for Address {
    /// The factory default address of common relay boards.
    fn default() -> Self {
        Address(1)
    }
}

impl TryFrom<u8> for Address {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Address(value))
        } else {
            Err(Error::AddressOutOfRange(value))
        }
    }
}

impl std::ops::Deref for Address {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The serial bit rate of the RTU link.
///
/// Restricted to the standard rates so a typo in configuration fails at
/// startup instead of producing a silent port that never answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "u32")
)]
pub struct BaudRate(u32);

impl BaudRate {
    pub const SUPPORTED: [u32; 8] = [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate(9600)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::SUPPORTED.contains(&value) {
            Ok(BaudRate(value))
        } else {
            Err(Error::BaudRateUnsupported(value))
        }
    }
}

impl From<&BaudRate> for u32 {
    fn from(value: &BaudRate) -> Self {
        value.0
    }
}

impl std::ops::Deref for BaudRate {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered, immutable mapping from logical relay number to coil address.
///
/// Boards commonly map relay k to coil address k-1; [`Default`] provides that
/// layout for an 8-channel board. Non-contiguous layouts can be supplied from
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "BTreeMap<u8, u16>")
)]
pub struct RelayAddressTable(BTreeMap<Relay, u16>);

impl RelayAddressTable {
    /// Builds the common contiguous layout: relay k maps to coil address k-1.
    pub fn contiguous(count: u8) -> Self {
        RelayAddressTable(
            (Self::default_relay_numbers(count))
                .map(|relay| (Relay(relay), u16::from(relay - 1)))
                .collect(),
        )
    }

    fn default_relay_numbers(count: u8) -> std::ops::RangeInclusive<u8> {
        // An empty range when count is 0.
        1..=count
    }

    /// Resolves a logical relay number to its coil address.
    pub fn coil_address(&self, relay: Relay) -> Option<u16> {
        self.0.get(&relay).copied()
    }

    pub fn contains(&self, relay: Relay) -> bool {
        self.0.contains_key(&relay)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(relay, coil address)` pairs in relay-number order.
    pub fn iter(&self) -> impl Iterator<Item = (Relay, u16)> + '_ {
        self.0.iter().map(|(relay, address)| (*relay, *address))
    }
}

impl Default for RelayAddressTable {
    /// 8 relays mapped to coil addresses 0-7.
    fn default() -> Self {
        Self::contiguous(8)
    }
}

impl TryFrom<BTreeMap<u8, u16>> for RelayAddressTable {
    type Error = Error;

    fn try_from(value: BTreeMap<u8, u16>) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::EmptyAddressTable);
        }
        let mut table = BTreeMap::new();
        for (relay, address) in value {
            table.insert(Relay::try_from(relay)?, address);
        }
        Ok(RelayAddressTable(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_try_from() {
        assert!(matches!(Relay::try_from(0), Err(Error::RelayOutOfRange(0))));
        assert!(matches!(Relay::try_from(1), Ok(relay) if *relay == 1));
        assert!(matches!(Relay::try_from(255), Ok(relay) if *relay == 255));
    }

    #[test]
    fn coil_state_round_trip() {
        assert_eq!(CoilState::from(true), CoilState::On);
        assert_eq!(CoilState::from(false), CoilState::Off);
        assert!(bool::from(CoilState::On));
        assert!(!bool::from(CoilState::Off));
        assert_eq!(CoilState::On.inverted(), CoilState::Off);
        assert_eq!(CoilState::Off.inverted(), CoilState::On);
    }

    #[test]
    fn coil_state_parsing() {
        assert_eq!("on".parse::<CoilState>().unwrap(), CoilState::On);
        assert_eq!("OFF".parse::<CoilState>().unwrap(), CoilState::Off);
        assert_eq!("1".parse::<CoilState>().unwrap(), CoilState::On);
        assert_eq!("false".parse::<CoilState>().unwrap(), CoilState::Off);
        assert!(matches!(
            "blink".parse::<CoilState>(),
            Err(Error::InvalidCoilState(..))
        ));
    }

    #[test]
    fn coil_state_display() {
        assert_eq!(CoilState::On.to_string(), "ON");
        assert_eq!(CoilState::Off.to_string(), "OFF");
    }

    #[test]
    fn address_try_from() {
        assert!(matches!(
            Address::try_from(0),
            Err(Error::AddressOutOfRange(0))
        ));
        assert!(matches!(Address::try_from(1), Ok(addr) if *addr == 1));
        assert!(matches!(Address::try_from(247), Ok(addr) if *addr == 247));
        assert!(matches!(
            Address::try_from(248),
            Err(Error::AddressOutOfRange(248))
        ));
        assert_eq!(*Address::default(), 1);
    }

    #[test]
    fn baud_rate_try_from() {
        assert!(matches!(BaudRate::try_from(9600), Ok(rate) if *rate == 9600));
        assert!(matches!(
            BaudRate::try_from(9601),
            Err(Error::BaudRateUnsupported(9601))
        ));
        assert_eq!(*BaudRate::default(), 9600);
    }

    #[test]
    fn default_table_is_contiguous() {
        let table = RelayAddressTable::default();
        assert_eq!(table.len(), 8);
        for number in 1..=8 {
            let relay = Relay::try_from(number).unwrap();
            assert_eq!(table.coil_address(relay), Some(u16::from(number - 1)));
        }
        assert_eq!(table.coil_address(Relay::try_from(9).unwrap()), None);
    }

    #[test]
    fn table_from_map_validates_relays() {
        let mut map = BTreeMap::new();
        map.insert(1u8, 0u16);
        map.insert(2u8, 1u16);
        let table = RelayAddressTable::try_from(map).unwrap();
        assert_eq!(table.coil_address(Relay::try_from(2).unwrap()), Some(1));

        let mut bad = BTreeMap::new();
        bad.insert(0u8, 0u16);
        assert!(matches!(
            RelayAddressTable::try_from(bad),
            Err(Error::RelayOutOfRange(0))
        ));

        assert!(matches!(
            RelayAddressTable::try_from(BTreeMap::new()),
            Err(Error::EmptyAddressTable)
        ));
    }
}
