//! Application configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::APP_NAME;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// PlatformIO executable, resolved from PATH when not set
    pub pio_executable: PathBuf,
    /// Side caches (board table, port list)
    pub cache_dir: PathBuf,
    /// Where the preferences file lives
    pub config_dir: PathBuf,
    /// Unsaved buffers are written below this directory
    pub temp_dir: PathBuf,
    /// Working directories for projects without the native layout
    pub build_dir: PathBuf,
    /// Discovery configuration
    pub discovery: DiscoveryConfig,
    /// Emit diagnostics for files that are not processed
    pub feedback: bool,
}

/// Port discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// How long to browse for network services
    pub mdns_timeout_ms: u64,
    /// Service type advertised by OTA-capable boards
    pub mdns_service_type: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_NAME);
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);

        Self {
            pio_executable: default_pio_executable(),
            temp_dir: std::env::temp_dir().join(APP_NAME),
            build_dir: cache_dir.join("build"),
            cache_dir,
            config_dir,
            discovery: DiscoveryConfig::default(),
            feedback: false,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mdns_timeout_ms: 2000,
            mdns_service_type: "_arduino._tcp.local.".to_string(),
        }
    }
}

impl AppConfig {
    /// Configuration rooted below a single directory, used by tests
    pub fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            pio_executable: PathBuf::from("pio"),
            cache_dir: root.join("cache"),
            config_dir: root.join("config"),
            temp_dir: root.join("tmp"),
            build_dir: root.join("build"),
            discovery: DiscoveryConfig::default(),
            feedback: false,
        }
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.config_dir.join("preferences.json")
    }

    pub fn board_cache_path(&self) -> PathBuf {
        self.cache_dir.join("platformio_boards.json")
    }

    pub fn port_cache_path(&self) -> PathBuf {
        self.cache_dir.join("serial.json")
    }
}

/// Look for `pio`, then `platformio`, on PATH
fn default_pio_executable() -> PathBuf {
    which::which("pio")
        .or_else(|_| which::which("platformio"))
        .unwrap_or_else(|_| PathBuf::from("pio"))
}
