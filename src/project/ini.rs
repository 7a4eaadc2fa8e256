//! Reading and rewriting `platformio.ini`
//!
//! The file is kept as an ordered list of sections, each an ordered list of
//! key/value lines. Comments are carried through untouched so a rewrite only
//! changes the keys that were actually mutated.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{PioBrewError, Result};

pub const CONFIG_FILE_NAME: &str = "platformio.ini";

/// Name of the global section
pub const GLOBAL_SECTION: &str = "platformio";

const ENV_PREFIX: &str = "env:";

/// A flag value: one string, or a list written as continuation lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IniValue {
    Single(String),
    List(Vec<String>),
}

impl IniValue {
    /// Value as one string, lists joined with spaces
    pub fn joined(&self) -> String {
        match self {
            IniValue::Single(value) => value.clone(),
            IniValue::List(items) => items.join(" "),
        }
    }
}

impl From<&str> for IniValue {
    fn from(value: &str) -> Self {
        IniValue::Single(value.to_string())
    }
}

impl From<String> for IniValue {
    fn from(value: String) -> Self {
        IniValue::Single(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Pair(String, IniValue),
    Comment(String),
}

/// One `[name]` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    lines: Vec<Line>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&IniValue> {
        self.lines.iter().find_map(|line| match line {
            Line::Pair(k, v) if k == key => Some(v),
            _ => None,
        })
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).map(IniValue::joined)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Pair(k, _) => Some(k.as_str()),
                Line::Comment(_) => None,
            })
            .collect()
    }

    /// Replace the value in place, or append the key at the end
    pub fn set(&mut self, key: &str, value: impl Into<IniValue>) {
        let value = value.into();
        for line in &mut self.lines {
            if let Line::Pair(k, v) = line {
                if k == key {
                    *v = value;
                    return;
                }
            }
        }
        self.lines.push(Line::Pair(key.to_string(), value));
    }

    pub fn remove(&mut self, key: &str) -> Option<IniValue> {
        let index = self
            .lines
            .iter()
            .position(|line| matches!(line, Line::Pair(k, _) if k == key))?;
        match self.lines.remove(index) {
            Line::Pair(_, value) => Some(value),
            Line::Comment(_) => None,
        }
    }

    pub fn merge<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<IniValue>,
    {
        for (key, value) in entries {
            self.set(key.as_ref(), value);
        }
    }
}

/// In-memory copy of one project configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfigFile {
    path: PathBuf,
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl ProjectConfigFile {
    /// Read the file, or start empty when it does not exist yet
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::empty(path));
        }
        let content = fs::read_to_string(&path)?;
        Ok(Self::parse(path, &content))
    }

    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            preamble: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn parse(path: PathBuf, content: &str) -> Self {
        let mut config = Self::empty(path);
        let mut last_key: Option<String> = None;

        for raw in content.lines() {
            let line = raw.trim();

            if line.is_empty() {
                last_key = None;
                continue;
            }

            if line.starts_with(';') || line.starts_with('#') {
                match config.sections.last_mut() {
                    Some(section) => section.lines.push(Line::Comment(line.to_string())),
                    None => config.preamble.push(line.to_string()),
                }
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                config.sections.push(Section::new(name.trim()));
                last_key = None;
                continue;
            }

            // Indented lines continue the previous key's value
            let indented = raw.starts_with([' ', '\t']);
            if indented {
                if let (Some(key), Some(section)) = (&last_key, config.sections.last_mut()) {
                    let continued = match section.get(key) {
                        Some(IniValue::Single(first)) if first.is_empty() => {
                            IniValue::List(vec![line.to_string()])
                        }
                        Some(IniValue::Single(first)) => {
                            IniValue::List(vec![first.clone(), line.to_string()])
                        }
                        Some(IniValue::List(items)) => {
                            let mut items = items.clone();
                            items.push(line.to_string());
                            IniValue::List(items)
                        }
                        None => IniValue::List(vec![line.to_string()]),
                    };
                    section.set(key, continued);
                    continue;
                }
            }

            let Some((key, value)) = line.split_once('=') else {
                log::debug!("Skipping unparsable line in {}: {}", config.path.display(), line);
                continue;
            };
            let Some(section) = config.sections.last_mut() else {
                log::debug!("Skipping key outside any section: {}", line);
                continue;
            };
            let key = key.trim().to_string();
            section.set(&key, value.trim());
            last_key = Some(key);
        }

        config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for comment in &self.preamble {
            out.push_str(comment);
            out.push('\n');
        }
        if !self.preamble.is_empty() && !self.sections.is_empty() {
            out.push('\n');
        }

        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", section.name));
            for line in &section.lines {
                match line {
                    Line::Comment(text) => {
                        out.push_str(text);
                        out.push('\n');
                    }
                    Line::Pair(key, IniValue::Single(value)) => {
                        out.push_str(&format!("{} = {}\n", key, value));
                    }
                    Line::Pair(key, IniValue::List(items)) => {
                        out.push_str(&format!("{} =\n", key));
                        for item in items {
                            out.push_str(&format!("    {}\n", item));
                        }
                    }
                }
            }
        }
        out
    }

    /// Rewrite the whole file
    pub fn write(&self) -> Result<()> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, self.to_ini_string())
        };
        write().map_err(|e| PioBrewError::ConfigWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        log::debug!("Wrote {}", self.path.display());
        Ok(())
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Get a section, creating it when missing. The global section is kept first.
    pub fn ensure_section(&mut self, name: &str) -> &mut Section {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None if name == GLOBAL_SECTION => {
                self.sections.insert(0, Section::new(name));
                0
            }
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    pub fn env_section(&self, environment: &str) -> Option<&Section> {
        self.section(&env_section_name(environment))
    }

    pub fn env_section_mut(&mut self, environment: &str) -> Option<&mut Section> {
        self.section_mut(&env_section_name(environment))
    }

    pub fn has_environment(&self, environment: &str) -> bool {
        self.env_section(environment).is_some()
    }

    /// Environment names in file order
    pub fn environments(&self) -> Vec<String> {
        self.sections
            .iter()
            .filter_map(|s| s.name.strip_prefix(ENV_PREFIX).map(str::to_string))
            .collect()
    }

    pub fn set_global(&mut self, key: &str, value: impl Into<IniValue>) {
        self.ensure_section(GLOBAL_SECTION).set(key, value);
    }
}

pub fn env_section_name(environment: &str) -> String {
    format!("{}{}", ENV_PREFIX, environment)
}
