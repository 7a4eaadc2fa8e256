//! Merges serial ports and network services into one selectable list

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DiscoveryConfig;
use crate::errors::{PioBrewError, Result};
use crate::models::port::{MANUAL_ADDRESS_INDEX, NetworkService, PortEntry, PortList};
use crate::remote::discovery::discover_ota_services;

pub const SELECT_PORT_LABEL: &str = "Select a port";
pub const ADD_ADDRESS_LABEL: &str = "Add a network address";
pub const NOTHING_FOUND_LABEL: &str = "No serial ports or network services found";
/// Metadata of rows typed in by the user, kept across discoveries
pub const MANUAL_METADATA: &str = "manual";

/// Source of connectable targets
pub trait PortScanner: Send + Sync {
    fn serial_ports(&self) -> Result<Vec<String>>;
    fn network_services(&self) -> Result<Vec<NetworkService>>;
}

/// Scanner backed by the operating system and mDNS
#[derive(Debug, Clone)]
pub struct SystemScanner {
    service_type: String,
    timeout: Duration,
}

impl SystemScanner {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            service_type: config.mdns_service_type.clone(),
            timeout: Duration::from_millis(config.mdns_timeout_ms),
        }
    }
}

impl PortScanner for SystemScanner {
    fn serial_ports(&self) -> Result<Vec<String>> {
        let ports = serialport::available_ports().map_err(|e| {
            PioBrewError::Discovery(format!("Failed to enumerate serial ports: {}", e))
        })?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn network_services(&self) -> Result<Vec<NetworkService>> {
        discover_ota_services(&self.service_type, self.timeout)
    }
}

/// Discovers targets and keeps the side cache of the last list
pub struct PortResolver {
    scanner: Arc<dyn PortScanner>,
    cache_path: PathBuf,
}

impl PortResolver {
    pub fn new(scanner: Arc<dyn PortScanner>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            scanner,
            cache_path: cache_path.into(),
        }
    }

    /// Enumerate both sources, tag the persisted port and write the cache.
    ///
    /// A failing source is logged and contributes nothing. Manual addresses
    /// from the previous cache are carried into the new list.
    pub fn list_serial_ports(&self, current_port: Option<&str>) -> PortList {
        let serial = self.scanner.serial_ports().unwrap_or_else(|e| {
            log::warn!("{}", e);
            Vec::new()
        });
        let services = self.scanner.network_services().unwrap_or_else(|e| {
            log::warn!("{}", e);
            Vec::new()
        });

        let mut list = build_port_list(&serial, &services, current_port);
        for address in self.cached_manual_addresses() {
            add_manual_address(&mut list, &address);
        }
        tag_current_port(&mut list, current_port);

        if let Err(e) = self.save_cache(&list) {
            log::warn!("Could not cache port list: {}", e);
        }
        list
    }

    /// Whether the service behind `port` asks for an OTA password
    pub fn auth_required(&self, port: &str) -> bool {
        match self.scanner.network_services() {
            Ok(services) => services
                .iter()
                .any(|s| s.address.to_string() == port && s.auth_upload),
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    pub fn save_cache(&self, list: &PortList) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&list.entries)?;
        fs::write(&self.cache_path, content).map_err(|e| PioBrewError::ConfigWrite {
            path: self.cache_path.clone(),
            reason: e.to_string(),
        })
    }

    pub fn load_cache(&self) -> Result<Option<PortList>> {
        if !self.cache_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.cache_path)?;
        let entries: Vec<PortEntry> = serde_json::from_str(&content)?;
        Ok(Some(PortList {
            entries,
            selected_index: 0,
        }))
    }

    fn cached_manual_addresses(&self) -> Vec<String> {
        match self.load_cache() {
            Ok(Some(list)) => list
                .discovered()
                .iter()
                .filter(|e| e.metadata() == MANUAL_METADATA)
                .map(|e| e.label().to_string())
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Ignoring unreadable port cache: {}", e);
                Vec::new()
            }
        }
    }
}

/// Two synthetic rows, then serial ports, then network services
pub fn build_port_list(
    serial: &[String],
    services: &[NetworkService],
    current_port: Option<&str>,
) -> PortList {
    let mut list = PortList {
        entries: vec![
            PortEntry(SELECT_PORT_LABEL.to_string(), String::new()),
            PortEntry(ADD_ADDRESS_LABEL.to_string(), String::new()),
        ],
        selected_index: 0,
    };

    for port in serial {
        list.push(PortEntry(port.clone(), String::new()));
    }
    for service in services {
        list.push(PortEntry(service.address.to_string(), service.board.clone()));
    }

    if list.discovered().is_empty() {
        list.entries[0] = PortEntry(NOTHING_FOUND_LABEL.to_string(), String::new());
    }

    tag_current_port(&mut list, current_port);
    list
}

/// Point `selected_index` at the row matching the persisted port
pub fn tag_current_port(list: &mut PortList, current_port: Option<&str>) {
    list.selected_index = current_port
        .and_then(|current| list.discovered().iter().position(|e| e.matches_port(current)))
        .map_or(0, |offset| offset + MANUAL_ADDRESS_INDEX + 1);
}

/// Append a manually entered address unless it is already listed
pub fn add_manual_address(list: &mut PortList, address: &str) {
    if list.contains_port(address) {
        return;
    }
    if list.discovered().is_empty() {
        if let Some(header) = list.entries.first_mut() {
            *header = PortEntry(SELECT_PORT_LABEL.to_string(), String::new());
        }
    }
    list.push(PortEntry(address.to_string(), MANUAL_METADATA.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    struct FixedScanner {
        serial: Vec<String>,
        services: Vec<NetworkService>,
    }

    impl PortScanner for FixedScanner {
        fn serial_ports(&self) -> Result<Vec<String>> {
            Ok(self.serial.clone())
        }

        fn network_services(&self) -> Result<Vec<NetworkService>> {
            Ok(self.services.clone())
        }
    }

    fn ota_service(auth_upload: bool) -> NetworkService {
        NetworkService {
            address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40)),
            hostname: "esp.local".to_string(),
            board: "esp32dev".to_string(),
            auth_upload,
        }
    }

    #[test]
    fn test_list_order_and_selected_index() {
        let list = build_port_list(
            &["COM3".to_string(), "COM5".to_string()],
            &[ota_service(false)],
            Some("192.168.1.40"),
        );
        let labels: Vec<_> = list.entries.iter().map(|e| e.label()).collect();
        assert_eq!(
            labels,
            vec![
                SELECT_PORT_LABEL,
                ADD_ADDRESS_LABEL,
                "COM3",
                "COM5",
                "192.168.1.40"
            ]
        );
        assert_eq!(list.entries[4].metadata(), "esp32dev");
        assert_eq!(list.selected_index, 4);
    }

    #[test]
    fn test_empty_discovery_uses_placeholder() {
        let list = build_port_list(&[], &[], Some("COM1"));
        assert_eq!(list.entries.len(), 2);
        assert_eq!(list.entries[0].label(), NOTHING_FOUND_LABEL);
        assert_eq!(list.selected_index, 0);
    }

    #[test]
    fn test_cache_roundtrip_and_auth_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = PortResolver::new(
            Arc::new(FixedScanner {
                serial: vec!["/dev/ttyUSB0".to_string()],
                services: vec![ota_service(true)],
            }),
            temp_dir.path().join("serial.json"),
        );

        assert!(resolver.load_cache().unwrap().is_none());
        let list = resolver.list_serial_ports(None);
        let cached = resolver.load_cache().unwrap().unwrap();
        assert_eq!(cached.entries, list.entries);

        let raw = fs::read_to_string(temp_dir.path().join("serial.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[3], serde_json::json!(["192.168.1.40", "esp32dev"]));

        assert!(resolver.auth_required("192.168.1.40"));
        assert!(!resolver.auth_required("/dev/ttyUSB0"));
    }

    #[test]
    fn test_manual_address_is_added_once() {
        let mut list = build_port_list(&[], &[], None);
        add_manual_address(&mut list, "10.0.0.9");
        add_manual_address(&mut list, "10.0.0.9");
        assert_eq!(list.discovered().len(), 1);
        assert!(list.contains_port("10.0.0.9"));
        assert_eq!(list.entries[0].label(), SELECT_PORT_LABEL);
        assert_eq!(list.discovered()[0].metadata(), MANUAL_METADATA);
    }

    #[test]
    fn test_saved_port_highlights_decorated_label() {
        let list = build_port_list(
            &["COM3".to_string(), "COM5 (Arduino)".to_string()],
            &[],
            Some("COM5"),
        );
        assert_eq!(list.selected_index, 3);
    }

    #[test]
    fn test_manual_addresses_survive_rediscovery() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = PortResolver::new(
            Arc::new(FixedScanner {
                serial: vec!["COM3".to_string()],
                services: Vec::new(),
            }),
            temp_dir.path().join("serial.json"),
        );

        let mut list = resolver.list_serial_ports(None);
        add_manual_address(&mut list, "10.0.0.7");
        resolver.save_cache(&list).unwrap();

        let list = resolver.list_serial_ports(Some("10.0.0.7"));
        let labels: Vec<_> = list.discovered().iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["COM3", "10.0.0.7"]);
        assert_eq!(list.selected_index, 3);

        let cached = resolver.load_cache().unwrap().unwrap();
        assert!(cached.contains_port("10.0.0.7"));
    }
}
