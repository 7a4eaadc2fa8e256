//! Board catalog cached from `pio boards --json-output`

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::{PioBrewError, Result};
use crate::models::board::{BoardInfo, LegacyBoardEntry};
use crate::models::selection::{SelectionItem, SelectionRequest};
use crate::process::{ProcessRunner, args, run_checked};
use crate::project::ProjectConfigFile;
use crate::utils::logging::ProgressReporter;

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFormat {
    List(Vec<BoardInfo>),
    Legacy(BTreeMap<String, LegacyBoardEntry>),
}

/// All boards known to the installed PlatformIO
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardCatalog {
    boards: Vec<BoardInfo>,
}

impl BoardCatalog {
    pub fn new(boards: Vec<BoardInfo>) -> Self {
        Self { boards }
    }

    /// Parse either the current array form or the older id-keyed map
    pub fn from_json(content: &str) -> Result<Self> {
        let boards = match serde_json::from_str::<CatalogFormat>(content)? {
            CatalogFormat::List(boards) => boards,
            CatalogFormat::Legacy(map) => map
                .into_iter()
                .map(|(id, entry)| BoardInfo {
                    name: entry.name.unwrap_or_else(|| id.clone()),
                    platform: entry.platform.unwrap_or_default(),
                    mcu: entry.build.and_then(|b| b.mcu).unwrap_or_default(),
                    vendor: entry.vendor.unwrap_or_default(),
                    frameworks: Vec::new(),
                    id,
                })
                .collect(),
        };
        Ok(Self { boards })
    }

    /// Load the cached table; a missing cache is an empty catalog
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No board cache at {}", path.display());
            return Ok(Self::default());
        }
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Ask PlatformIO for its board list and rewrite the cache
    pub fn refresh(
        runner: &dyn ProcessRunner,
        cwd: &Path,
        cache_path: &Path,
        reporter: &ProgressReporter,
    ) -> Result<Self> {
        reporter.info("Updating board list...".to_string());
        let outcome = run_checked(runner, cwd, &args(["boards", "--json-output"]), reporter)?;
        let json = extract_json(&outcome.output.join("\n")).ok_or_else(|| {
            PioBrewError::Serialization("pio boards produced no JSON output".to_string())
        })?;
        let catalog = Self::from_json(&json)?;

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(cache_path, &json).map_err(|e| PioBrewError::ConfigWrite {
            path: cache_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        reporter.info(format!("{} boards available", catalog.len()));
        Ok(catalog)
    }

    pub fn boards(&self) -> &[BoardInfo] {
        &self.boards
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&BoardInfo> {
        self.boards.iter().find(|b| b.id == id)
    }

    /// MCU of the board behind `environment`.
    ///
    /// Native projects may name environments freely, so the `board` key of
    /// the environment section wins over the environment name.
    pub fn mcu_for(&self, environment: &str, config: Option<&ProjectConfigFile>) -> Option<String> {
        let board_id = config
            .and_then(|c| c.env_section(environment))
            .and_then(|s| s.get_str("board"))
            .unwrap_or_else(|| environment.to_string());
        self.get(&board_id).map(|b| b.mcu.clone())
    }

    /// Board menu, labels `"<name> | <id>"`, values the board id
    pub fn board_menu(&self) -> SelectionRequest {
        let mut boards: Vec<&BoardInfo> = self.boards.iter().collect();
        boards.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        SelectionRequest::new(
            "Select a board",
            boards
                .into_iter()
                .map(|b| SelectionItem::new(b.menu_label(), b.id.clone()))
                .collect(),
        )
    }
}

/// Slice from the first `[`/`{` to the last `]`/`}`, dropping tool chatter
fn extract_json(output: &str) -> Option<String> {
    let start = output.find(['[', '{'])?;
    let end = output.rfind([']', '}'])?;
    (end >= start).then(|| output[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BOARDS_JSON: &str = r#"[
        {"id": "uno", "name": "Arduino Uno", "platform": "atmelavr", "mcu": "ATMEGA328P", "vendor": "Arduino", "frameworks": ["arduino"]},
        {"id": "esp32dev", "name": "Espressif ESP32 Dev Module", "platform": "espressif32", "mcu": "ESP32", "vendor": "Espressif", "frameworks": ["arduino", "espidf"]}
    ]"#;

    #[test]
    fn test_parse_array_form() {
        let catalog = BoardCatalog::from_json(BOARDS_JSON).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("esp32dev").unwrap().mcu, "ESP32");
    }

    #[test]
    fn test_parse_legacy_map_form() {
        let catalog = BoardCatalog::from_json(
            r#"{"nodemcuv2": {"name": "NodeMCU 1.0", "build": {"mcu": "esp8266"}}, "bare": {}}"#,
        )
        .unwrap();
        assert_eq!(catalog.get("nodemcuv2").unwrap().mcu, "esp8266");
        assert_eq!(catalog.get("bare").unwrap().name, "bare");
    }

    #[test]
    fn test_mcu_prefers_board_key_of_environment() {
        let catalog = BoardCatalog::from_json(BOARDS_JSON).unwrap();
        let config = ProjectConfigFile::parse(
            PathBuf::from("platformio.ini"),
            "[env:kitchen]\nboard = esp32dev\n",
        );
        assert_eq!(
            catalog.mcu_for("kitchen", Some(&config)).as_deref(),
            Some("ESP32")
        );
        assert_eq!(catalog.mcu_for("uno", None).as_deref(), Some("ATMEGA328P"));
        assert_eq!(catalog.mcu_for("unknown", None), None);
    }

    #[test]
    fn test_board_menu_sorted_by_name() {
        let menu = BoardCatalog::from_json(BOARDS_JSON).unwrap().board_menu();
        assert_eq!(menu.items[0].label, "Arduino Uno | uno");
        assert_eq!(menu.items[1].value, "esp32dev");
    }

    #[test]
    fn test_extract_json_skips_chatter() {
        let output = "Checking installed packages\n[{\"id\": \"uno\", \"name\": \"Uno\"}]\nDone";
        let json = extract_json(output).unwrap();
        assert!(BoardCatalog::from_json(&json).is_ok());
        assert!(extract_json("nothing here").is_none());
    }
}
