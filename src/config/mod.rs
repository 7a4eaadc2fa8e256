//! Configuration management for piobrew

pub mod app_config;
pub mod preferences;

pub use app_config::*;
pub use preferences::*;
