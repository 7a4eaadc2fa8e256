//! The contract the orchestrator needs from the editor and its UI

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::models::selection::{InputCallback, SelectionCallback, SelectionRequest};

/// Snapshot of the file the user is working on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFile {
    /// `None` while the buffer was never saved
    pub path: Option<PathBuf>,
    /// Title of the view, used to recognise monitor views
    pub view_name: String,
    pub contents: String,
    pub is_dirty: bool,
}

impl ActiveFile {
    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn is_monitor_view(&self) -> bool {
        self.path.is_none() && self.view_name.to_lowercase().contains("monitor")
    }
}

/// Editor, selection UI and serial monitor, as seen by the orchestrator.
///
/// `select` and `prompt_input` may answer synchronously (calling the
/// callback before returning) or later from any thread. Each callback is
/// invoked at most once.
pub trait Host: Send + Sync {
    fn active_file(&self) -> ActiveFile;

    /// Save the dirty active buffer in place
    fn save_active(&self) -> Result<()>;

    /// Replace the active view with the file at `path`
    fn open_file(&self, path: &Path);

    fn select(&self, request: SelectionRequest, on_done: SelectionCallback);

    fn prompt_input(&self, caption: &str, on_done: InputCallback);

    /// Close running serial monitors, returning whether any was open
    fn stop_serial_monitors(&self) -> bool;

    fn start_serial_monitor(&self, port: &str);
}
