//! Port discovery and selection lists

pub mod resolver;

pub use resolver::*;
