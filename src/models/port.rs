//! Selectable communication targets

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Network service advertising an OTA-capable board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkService {
    /// Address used as the upload port
    pub address: IpAddr,
    pub hostname: String,
    /// Board id advertised in the TXT record
    pub board: String,
    /// Whether the board asks for a password before accepting an upload
    pub auth_upload: bool,
}

/// One row of the port list: `[label, metadata]` on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry(pub String, pub String);

impl PortEntry {
    pub fn label(&self) -> &str {
        &self.0
    }

    pub fn metadata(&self) -> &str {
        &self.1
    }

    /// Prefix match of a saved port against this entry.
    ///
    /// `"COM5"` matches `"COM5"` and `"COM5 (Arduino)"` but not `"COM51"`.
    pub fn matches_port(&self, port: &str) -> bool {
        if port.is_empty() {
            return false;
        }
        match self.label().strip_prefix(port) {
            Some(rest) => rest.is_empty() || rest.starts_with([' ', '(', '\t']),
            None => false,
        }
    }
}

/// Number of synthetic rows at the top of every port list
pub const SYNTHETIC_ENTRIES: usize = 2;

/// Index of the "add manual address" row
pub const MANUAL_ADDRESS_INDEX: usize = 1;

/// Merged list of serial ports and network services
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortList {
    pub entries: Vec<PortEntry>,
    /// Row matching the persisted port, 0 when none matched
    pub selected_index: usize,
}

impl PortList {
    /// Discovered rows, without the synthetic header entries
    pub fn discovered(&self) -> &[PortEntry] {
        self.entries.get(SYNTHETIC_ENTRIES..).unwrap_or_default()
    }

    pub fn contains_port(&self, port: &str) -> bool {
        self.discovered().iter().any(|entry| entry.matches_port(port))
    }

    pub fn push(&mut self, entry: PortEntry) {
        self.entries.push(entry);
    }
}

/// A port is local serial when it names a COM port or a device node
pub fn is_serial_port(port: &str) -> bool {
    let upper = port.to_uppercase();
    upper.starts_with("COM") || port.starts_with("/dev/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(labels: &[&str]) -> PortList {
        let mut entries = vec![
            PortEntry("Select a port".into(), String::new()),
            PortEntry("Add address".into(), String::new()),
        ];
        entries.extend(labels.iter().map(|l| PortEntry(l.to_string(), String::new())));
        PortList {
            entries,
            selected_index: 0,
        }
    }

    #[test]
    fn test_prefix_match_accepts_decorated_label() {
        assert!(list(&["COM5 (Arduino)"]).contains_port("COM5"));
    }

    #[test]
    fn test_prefix_match_rejects_other_port() {
        assert!(!list(&["COM7"]).contains_port("COM5"));
        assert!(!list(&["COM51"]).contains_port("COM5"));
    }

    #[test]
    fn test_synthetic_rows_never_match() {
        assert!(!list(&[]).contains_port("Select"));
        assert!(!list(&["COM1"]).contains_port(""));
    }

    #[test]
    fn test_serial_port_detection() {
        assert!(is_serial_port("COM3"));
        assert!(is_serial_port("/dev/ttyUSB0"));
        assert!(!is_serial_port("192.168.1.5"));
    }
}
