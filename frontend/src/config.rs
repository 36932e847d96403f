//! Optional settings file. Command-line values take precedence over it.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub machine: Option<String>,
    pub rom: Option<PathBuf>,
    pub load_address: Option<u16>,
    pub entry: Option<u16>,
    pub frames: Option<u32>,
    pub frame_tstates: Option<u32>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read settings: {e}"),
            Self::Parse(e) => write!(f, "invalid settings: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

/// `<config dir>/z80emu/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("z80emu").join("config.toml"))
}

pub fn parse(text: &str) -> Result<Settings, ConfigError> {
    Ok(toml::from_str(text)?)
}

pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    parse(&std::fs::read_to_string(path)?)
}

/// Settings from the default location, or defaults when there is no file.
pub fn load_default() -> Result<Settings, ConfigError> {
    match default_path() {
        Some(path) if path.exists() => load(&path),
        _ => Ok(Settings::default()),
    }
}
