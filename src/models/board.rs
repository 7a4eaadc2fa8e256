//! Board metadata as reported by `pio boards --json-output`

use serde::{Deserialize, Serialize};

/// One supported board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub mcu: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub frameworks: Vec<String>,
}

impl BoardInfo {
    /// Espressif parts are the only ones that take OTA uploads
    pub fn is_wireless_capable(&self) -> bool {
        is_wireless_mcu(&self.mcu)
    }

    /// Label shown in the board menu, the id is recovered after `" | "`
    pub fn menu_label(&self) -> String {
        format!("{} | {}", self.name, self.id)
    }
}

pub fn is_wireless_mcu(mcu: &str) -> bool {
    mcu.to_lowercase().contains("esp")
}

/// Legacy catalog entry keyed by board id, with the MCU under `build`
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyBoardEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub build: Option<LegacyBuildSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyBuildSection {
    #[serde(default)]
    pub mcu: Option<String>,
}
