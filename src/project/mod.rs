//! PlatformIO project files: configuration, programmers and source placement

pub mod ini;
pub mod programmer;
pub mod source;

pub use ini::{CONFIG_FILE_NAME, GLOBAL_SECTION, IniValue, ProjectConfigFile, Section};
pub use programmer::{PROGRAMMERS, Programmer, UPLOAD_FLAG_KEYS, apply_programmer};
