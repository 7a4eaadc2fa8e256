//! Hardware programmer overrides for the upload step

use crate::errors::{PioBrewError, Result};
use crate::project::ini::ProjectConfigFile;

/// Keys owned by the programmer override; cleared before every merge
pub const UPLOAD_FLAG_KEYS: [&str; 4] = [
    "upload_protocol",
    "upload_flags",
    "upload_speed",
    "upload_port",
];

/// Value of one programmer flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagValue {
    Literal(&'static str),
    /// Replaced by the currently selected port
    CurrentPort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Programmer {
    pub id: &'static str,
    pub description: &'static str,
    pub flags: &'static [(&'static str, FlagValue)],
}

impl Programmer {
    /// Flags with the port placeholder resolved
    pub fn resolved_flags(&self, port: &str) -> Vec<(&'static str, String)> {
        self.flags
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    FlagValue::Literal(text) => text.to_string(),
                    FlagValue::CurrentPort => port.to_string(),
                };
                (*key, value)
            })
            .collect()
    }
}

pub const PROGRAMMERS: &[Programmer] = &[
    Programmer {
        id: "avr",
        description: "AVR ISP",
        flags: &[
            ("upload_protocol", FlagValue::Literal("stk500v1")),
            ("upload_flags", FlagValue::Literal("-P$UPLOAD_PORT")),
            ("upload_port", FlagValue::CurrentPort),
        ],
    },
    Programmer {
        id: "avrmkii",
        description: "AVRISP mkII",
        flags: &[
            ("upload_protocol", FlagValue::Literal("stk500v2")),
            ("upload_flags", FlagValue::Literal("-Pusb")),
        ],
    },
    Programmer {
        id: "usbtyni",
        description: "USBtinyISP",
        flags: &[("upload_protocol", FlagValue::Literal("usbtiny"))],
    },
    Programmer {
        id: "arduinoisp",
        description: "ArduinoISP",
        flags: &[("upload_protocol", FlagValue::Literal("arduinoisp"))],
    },
    Programmer {
        id: "usbasp",
        description: "USBasp",
        flags: &[
            ("upload_protocol", FlagValue::Literal("usbasp")),
            ("upload_flags", FlagValue::Literal("-Pusb")),
        ],
    },
    Programmer {
        id: "parallel",
        description: "Parallel Programmer",
        flags: &[
            ("upload_protocol", FlagValue::Literal("dapa")),
            ("upload_flags", FlagValue::Literal("-F")),
        ],
    },
    Programmer {
        id: "arduinoasisp",
        description: "Arduino as ISP",
        flags: &[
            ("upload_protocol", FlagValue::Literal("stk500v1")),
            (
                "upload_flags",
                FlagValue::Literal("-P$UPLOAD_PORT -b$UPLOAD_SPEED"),
            ),
            ("upload_speed", FlagValue::Literal("19200")),
            ("upload_port", FlagValue::CurrentPort),
        ],
    },
];

pub fn find_programmer(id: &str) -> Option<&'static Programmer> {
    PROGRAMMERS.iter().find(|p| p.id == id)
}

/// Clear the upload keys of `environment`, then merge the chosen programmer.
///
/// `None` (or `"none"`) only clears. The file is rewritten before returning.
pub fn apply_programmer(
    config: &mut ProjectConfigFile,
    environment: &str,
    choice: Option<&str>,
    port: &str,
) -> Result<()> {
    let programmer = match choice.filter(|c| *c != "none") {
        Some(id) => Some(
            find_programmer(id)
                .ok_or_else(|| PioBrewError::Config(format!("Unknown programmer: {}", id)))?,
        ),
        None => None,
    };

    let path = config.path().to_path_buf();
    let section = config.env_section_mut(environment).ok_or_else(|| {
        PioBrewError::Config(format!(
            "Environment {} not found in {}",
            environment,
            path.display()
        ))
    })?;

    for key in UPLOAD_FLAG_KEYS {
        section.remove(key);
    }
    if let Some(programmer) = programmer {
        log::debug!("Applying programmer {} to {}", programmer.id, environment);
        section.merge(programmer.resolved_flags(port));
    }

    config.write()
}
