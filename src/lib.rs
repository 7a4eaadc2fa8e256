//! PioBrew - PlatformIO build and upload orchestration
//!
//! PioBrew drives `pio` for a single sketch or source file: it resolves the
//! board, environment, port and OTA password the action needs (asking the
//! host for whatever is missing), keeps `platformio.ini` in step with those
//! choices and runs init, build, upload or clean on a worker thread.

pub mod boards;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod ports;
pub mod process;
pub mod project;
pub mod remote;
pub mod utils;

// Re-export commonly used types
pub use errors::*;
pub use models::*;
pub use orchestrator::{Collaborators, FlowState, Orchestrator, Precondition};

/// PioBrew version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PioBrew application name
pub const APP_NAME: &str = "piobrew";
