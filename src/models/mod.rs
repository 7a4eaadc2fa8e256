//! Data models and types used throughout piobrew

pub mod board;
pub mod events;
pub mod port;
pub mod selection;
pub mod session;

// Re-export commonly used types
pub use board::*;
pub use events::*;
pub use port::*;
pub use selection::*;
pub use session::*;
