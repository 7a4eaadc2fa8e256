//! mDNS discovery of OTA-capable boards
//!
//! Boards running an OTA service advertise themselves with TXT records such
//! as `board=esp32dev` and `auth_upload=yes`. A record without an address or
//! a board id is skipped; every other field falls back to a default.

use mdns_sd::{ServiceDaemon, ServiceEvent};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::errors::{PioBrewError, Result};
use crate::models::port::NetworkService;

/// Browse `service_type` until `timeout` elapses and collect resolved services
pub fn discover_ota_services(service_type: &str, timeout: Duration) -> Result<Vec<NetworkService>> {
    let mdns = ServiceDaemon::new()
        .map_err(|e| PioBrewError::Discovery(format!("Failed to create mDNS daemon: {}", e)))?;

    let receiver = mdns
        .browse(service_type)
        .map_err(|e| PioBrewError::Discovery(format!("Failed to start mDNS browse: {}", e)))?;

    log::debug!("Browsing for {} services...", service_type);

    let mut services: Vec<NetworkService> = Vec::new();
    let start_time = Instant::now();

    while start_time.elapsed() < timeout {
        let remaining_time = timeout - start_time.elapsed();

        match receiver.recv_timeout(remaining_time) {
            Ok(ServiceEvent::ServiceResolved(info)) => {
                let properties: HashMap<String, String> = info
                    .get_properties()
                    .iter()
                    .filter_map(|property| {
                        let property_string = format!("{}", property);
                        property_string
                            .split_once('=')
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                    })
                    .collect();
                let addresses: Vec<IpAddr> = info.get_addresses().iter().copied().collect();

                match parse_service(info.get_hostname(), &addresses, &properties) {
                    Some(service) => {
                        log::debug!("Discovered {} at {}", service.board, service.address);
                        if !services.iter().any(|s| s.address == service.address) {
                            services.push(service);
                        }
                    }
                    None => log::debug!("Skipping incomplete service {}", info.get_fullname()),
                }
            }
            Ok(ServiceEvent::SearchStopped(_)) => break,
            Ok(_) => {}
            Err(_) => {
                // Timeout reached or daemon gone
                break;
            }
        }
    }

    // Stop the browse operation
    let _ = mdns.stop_browse(service_type);
    let _ = mdns.shutdown();

    Ok(services)
}

/// Build a service from one resolved record, `None` when it is unusable
pub fn parse_service(
    hostname: &str,
    addresses: &[IpAddr],
    properties: &HashMap<String, String>,
) -> Option<NetworkService> {
    let mut sorted = addresses.to_vec();
    sorted.sort();
    let address = sorted
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| sorted.first())
        .copied()?;

    let board = properties.get("board").filter(|b| !b.is_empty())?.clone();
    let auth_upload = properties
        .get("auth_upload")
        .map(|v| v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);

    Some(NetworkService {
        address,
        hostname: hostname.trim_end_matches('.').to_string(),
        board,
        auth_upload,
    })
}
