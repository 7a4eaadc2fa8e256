//! Per-invocation session state

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::project::CONFIG_FILE_NAME;

/// Terminal action the flow is working toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Init,
    Build,
    Upload,
    Clean,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::Build => "build",
            Action::Upload => "upload",
            Action::Clean => "clean",
        }
    }

    /// Only uploads need a communication target
    pub fn needs_port(&self) -> bool {
        matches!(self, Action::Upload)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "init" => Ok(Action::Init),
            "build" => Ok(Action::Build),
            "upload" => Ok(Action::Upload),
            "clean" => Ok(Action::Clean),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// Everything one pass of the flow knows about the active file.
///
/// Rebuilt from the host and the preferences on every entry; never stored
/// across invocations.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Absolute path of the active file, `None` while unsaved
    pub source_path: Option<PathBuf>,
    /// Byte length of the open buffer
    pub source_size: usize,
    pub file_name: String,
    pub is_eligible: bool,
    pub is_native_layout: bool,
    /// Directory holding the source file
    pub sketch_dir: PathBuf,
    working_directory: PathBuf,
    config_file_path: PathBuf,
    pub selected_environment: Option<String>,
    pub selected_port: Option<String>,
    pub pending_action: Action,
    pub auth_required: bool,
    pub auth_value: Option<String>,
    pub last_run_failed: bool,
}

impl SessionContext {
    pub fn new(pending_action: Action) -> Self {
        Self {
            source_path: None,
            source_size: 0,
            file_name: String::new(),
            is_eligible: false,
            is_native_layout: false,
            sketch_dir: PathBuf::new(),
            working_directory: PathBuf::new(),
            config_file_path: PathBuf::new(),
            selected_environment: None,
            selected_port: None,
            pending_action,
            auth_required: false,
            auth_value: None,
            last_run_failed: false,
        }
    }

    pub fn working_directory(&self) -> &PathBuf {
        &self.working_directory
    }

    /// Path of `platformio.ini`, always derived from the working directory
    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_file_path
    }

    pub fn set_working_directory(&mut self, dir: PathBuf) {
        self.config_file_path = dir.join(CONFIG_FILE_NAME);
        self.working_directory = dir;
    }

    pub fn environment(&self) -> &str {
        self.selected_environment.as_deref().unwrap_or_default()
    }

    pub fn port(&self) -> &str {
        self.selected_port.as_deref().unwrap_or_default()
    }
}
