//! Custom error types for piobrew

use std::fmt;
use std::path::PathBuf;

/// Main error type for piobrew operations
#[derive(Debug)]
pub enum PioBrewError {
    /// The active file is not a firmware project source
    IneligibleFile(String),
    /// The active buffer is empty
    EmptyBuffer,
    /// An external command exited with a failure status
    ProcessFailure {
        command: String,
        output_tail: Vec<String>,
    },
    /// The external command could not be started at all
    ProcessSpawn(String),
    /// Persisting a configuration file failed
    ConfigWrite { path: PathBuf, reason: String },
    /// Moving the source file into the native layout failed
    FileRelocation {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
    /// No ports or network services could be enumerated
    Discovery(String),
    /// A worker thread panicked or could not be spawned
    Worker(String),
    /// Configuration related errors
    Config(String),
    /// General I/O errors
    Io(std::io::Error),
    /// Serialization errors
    Serialization(String),
}

impl fmt::Display for PioBrewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PioBrewError::IneligibleFile(name) => {
                write!(f, "{} is not a firmware project file", name)
            }
            PioBrewError::EmptyBuffer => write!(f, "Nothing to process, the sketch is empty"),
            PioBrewError::ProcessFailure {
                command,
                output_tail,
            } => {
                write!(f, "Command failed: {}", command)?;
                for line in output_tail {
                    write!(f, "\n  {}", line)?;
                }
                Ok(())
            }
            PioBrewError::ProcessSpawn(msg) => write!(f, "Failed to start command: {}", msg),
            PioBrewError::ConfigWrite { path, reason } => {
                write!(f, "Failed to write {}: {}", path.display(), reason)
            }
            PioBrewError::FileRelocation { from, to, reason } => write!(
                f,
                "Failed to move {} to {}: {}",
                from.display(),
                to.display(),
                reason
            ),
            PioBrewError::Discovery(msg) => write!(f, "Discovery error: {}", msg),
            PioBrewError::Worker(msg) => write!(f, "Worker thread error: {}", msg),
            PioBrewError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PioBrewError::Io(err) => write!(f, "I/O error: {}", err),
            PioBrewError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for PioBrewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PioBrewError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PioBrewError {
    fn from(err: std::io::Error) -> Self {
        PioBrewError::Io(err)
    }
}

impl From<serde_json::Error> for PioBrewError {
    fn from(err: serde_json::Error) -> Self {
        PioBrewError::Serialization(err.to_string())
    }
}

impl PioBrewError {
    /// True when the error came from the external tool's exit status
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            PioBrewError::ProcessFailure { .. } | PioBrewError::ProcessSpawn(_)
        )
    }
}

/// Result type alias for piobrew operations
pub type Result<T> = std::result::Result<T, PioBrewError>;
