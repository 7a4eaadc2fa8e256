//! Network discovery of remote upload targets

pub mod discovery;

pub use discovery::*;
