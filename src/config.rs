use crate::commandline::CliArgs;
use anyhow::Context;
use relay_panel_lib::{protocol as proto, tokio_sync_client::ClientConfig};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Loads a relay address table from a YAML file.
///
/// The file is a plain mapping from logical relay number to coil address,
/// e.g. `{1: 0x0000, 2: 0x0001}`. Validation happens through the protocol
/// types, so a zero relay number or an empty map is rejected here.
fn load_relay_map(path: &Path) -> anyhow::Result<proto::RelayAddressTable> {
    log::debug!("Loading relay map from {:?}", path);
    let file = File::open(path).with_context(|| format!("Cannot open relay map {path:?}"))?;
    let map: BTreeMap<u8, u16> = serde_yaml::from_reader(&file)
        .with_context(|| format!("Relay map {path:?} is not a valid relay-to-address mapping"))?;
    proto::RelayAddressTable::try_from(map)
        .with_context(|| format!("Relay map {path:?} contains invalid entries"))
}

/// Assembles the immutable client configuration from the command line.
pub(crate) fn client_config(args: &CliArgs) -> anyhow::Result<ClientConfig> {
    let relays = match &args.relay_map {
        Some(path) => load_relay_map(path)?,
        None => proto::RelayAddressTable::default(),
    };
    Ok(ClientConfig {
        device: args.device.clone(),
        baud_rate: args.baud_rate,
        timeout: args.timeout,
        address: args.address,
        relays,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_map(content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "relayctl-test-map-{}-{content_len}.yml",
            std::process::id(),
            content_len = content.len()
        ));
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn relay_map_file_round_trip() {
        let path = write_temp_map("{1: 0x0000, 2: 0x0001, 5: 0x0010}");
        let table = load_relay_map(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.len(), 3);
        let relay = |n| proto::Relay::try_from(n).unwrap();
        assert_eq!(table.coil_address(relay(1)), Some(0));
        assert_eq!(table.coil_address(relay(5)), Some(0x10));
        assert_eq!(table.coil_address(relay(3)), None);
    }

    #[test]
    fn relay_map_file_rejects_relay_zero() {
        let path = write_temp_map("{0: 0x0000}");
        let result = load_relay_map(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn missing_relay_map_file_is_an_error() {
        let path = Path::new("/nonexistent/relayctl-map.yml");
        assert!(load_relay_map(path).is_err());
    }
}
