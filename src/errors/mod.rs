//! Error types for piobrew

pub mod types;

pub use types::*;
