//! Persisted user preferences
//!
//! A flat JSON object on disk. Every mutation rewrites the whole file so an
//! interrupted process never leaves a half-written store behind.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::errors::{PioBrewError, Result};

pub const KEY_PORT: &str = "id_port";
pub const KEY_BOARDS: &str = "board_id";
pub const KEY_NATIVE_BOARDS: &str = "found_ini";
pub const KEY_ENVIRONMENT: &str = "env_selected";
pub const KEY_NATIVE_ENVIRONMENT: &str = "native_env_selected";
pub const KEY_AUTH: &str = "auth";
pub const KEY_PROGRAMMER: &str = "programmer";
pub const KEY_AUTORUN_MONITOR: &str = "autorun_monitor";
pub const KEY_PROTECTED: &str = "protected";
pub const KEY_NATIVE: &str = "native";

/// Sentinel stored under `auth` once a target was checked and needs no password
pub const AUTH_NOT_REQUIRED: &str = "0";

/// Resolved state of the OTA password preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    NotRequired,
    Password(String),
}

/// Typed accessor over the preferences file
#[derive(Debug)]
pub struct Preferences {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl Preferences {
    /// Load preferences from `path`, starting empty when the file is missing
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!(
                        "Ignoring malformed preferences file {}: {}",
                        path.display(),
                        e
                    );
                    Map::new()
                }
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Preferences that are never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Non-empty string value
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut values = self.lock();
        values.insert(key.to_string(), value.into());
        self.persist(&values)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.lock();
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(values).map_err(std::io::Error::other)?;
            fs::write(path, content)
        };
        write().map_err(|e| PioBrewError::ConfigWrite {
            path: path.clone(),
            reason: e.to_string(),
        })
    }

    pub fn port(&self) -> Option<String> {
        self.get_str(KEY_PORT)
    }

    pub fn set_port(&self, port: &str) -> Result<()> {
        self.set(KEY_PORT, port)
    }

    /// Board ids offered as environments (`found_ini` for native projects)
    pub fn boards(&self, native: bool) -> Vec<String> {
        self.get_list(board_key(native))
    }

    pub fn set_boards(&self, native: bool, boards: Vec<String>) -> Result<()> {
        self.set(board_key(native), boards)
    }

    /// Add a board to the selected list, keeping the existing order
    pub fn select_board(&self, native: bool, board_id: &str) -> Result<()> {
        let mut boards = self.boards(native);
        if !boards.iter().any(|b| b == board_id) {
            boards.push(board_id.to_string());
            self.set_boards(native, boards)?;
        }
        Ok(())
    }

    pub fn environment(&self, native: bool) -> Option<String> {
        self.get_str(environment_key(native))
    }

    pub fn set_environment(&self, native: bool, environment: &str) -> Result<()> {
        self.set(environment_key(native), environment)
    }

    pub fn auth(&self) -> AuthState {
        match self.get_str(KEY_AUTH) {
            None => AuthState::Unknown,
            Some(value) if value == AUTH_NOT_REQUIRED => AuthState::NotRequired,
            Some(value) => AuthState::Password(value),
        }
    }

    pub fn set_auth(&self, value: &str) -> Result<()> {
        self.set(KEY_AUTH, value)
    }

    pub fn programmer(&self) -> Option<String> {
        self.get_str(KEY_PROGRAMMER).filter(|p| p != "none")
    }

    pub fn set_programmer(&self, programmer: Option<&str>) -> Result<()> {
        match programmer {
            Some(id) => self.set(KEY_PROGRAMMER, id),
            None => self.remove(KEY_PROGRAMMER),
        }
    }

    pub fn autorun_monitor(&self) -> bool {
        self.get_bool(KEY_AUTORUN_MONITOR)
    }

    pub fn set_autorun_monitor(&self, enabled: bool) -> Result<()> {
        self.set(KEY_AUTORUN_MONITOR, enabled)
    }

    pub fn is_protected(&self) -> bool {
        self.get_bool(KEY_PROTECTED)
    }

    pub fn is_native(&self) -> bool {
        self.get_bool(KEY_NATIVE)
    }

    pub fn set_native(&self, native: bool) -> Result<()> {
        self.set(KEY_NATIVE, native)
    }
}

pub fn environment_key(native: bool) -> &'static str {
    if native {
        KEY_NATIVE_ENVIRONMENT
    } else {
        KEY_ENVIRONMENT
    }
}

pub fn board_key(native: bool) -> &'static str {
    if native { KEY_NATIVE_BOARDS } else { KEY_BOARDS }
}
