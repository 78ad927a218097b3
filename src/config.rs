//! Configuration loading for nhbot.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.nhbot/config.toml`
//! - Defaults for every field, so a missing or partial file works
//!
//! # Configuration File
//!
//! The configuration file is located at `~/.nhbot/config.toml`:
//!
//! ```toml
//! # How long the stream must stay silent before the screen is
//! # considered settled, in milliseconds.
//! idle_timeout_ms = 300
//!
//! [connection]
//! # Local game process...
//! command = "/usr/games/nethack"
//! # ...or a telnet server (used when no command is set).
//! # host = "nethack.alt.org"
//! # port = 23
//!
//! [character]
//! name = "bot"
//! role = "Valkyrie"
//! race = "dwarf"
//! gender = "female"
//! alignment = "lawful"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Idle timeout in milliseconds
    pub idle_timeout_ms: u64,
    /// Where to find the game
    pub connection: ConnectionConfig,
    /// Character creation choices
    pub character: CharacterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 300,
            connection: ConnectionConfig::default(),
            character: CharacterConfig::default(),
        }
    }
}

/// Where to find the game: a local command, or a telnet server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Local game command, takes precedence over host
    pub command: Option<String>,
    /// Telnet server host
    pub host: Option<String>,
    /// Telnet server port
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            command: None,
            host: None,
            port: 23,
        }
    }
}

/// Character creation choices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub name: String,
    pub role: String,
    pub race: String,
    pub gender: String,
    pub alignment: String,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            name: "bot".to_string(),
            role: "Valkyrie".to_string(),
            race: "dwarf".to_string(),
            gender: "female".to_string(),
            alignment: "lawful".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path. A missing file yields
    /// the defaults; a malformed one is reported and ignored.
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => warn!("ignoring {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {e}"))
    }

    /// Get config file path
    fn config_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".nhbot").join("config.toml"))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.idle_timeout(), Duration::from_millis(300));
        assert_eq!(config.connection.port, 23);
        assert!(config.connection.command.is_none());
        assert_eq!(config.character.role, "Valkyrie");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            idle_timeout_ms = 150

            [connection]
            host = "nethack.alt.org"
            "#,
        )
        .unwrap();
        assert_eq!(config.idle_timeout(), Duration::from_millis(150));
        assert_eq!(config.connection.host.as_deref(), Some("nethack.alt.org"));
        assert_eq!(config.connection.port, 23);
        assert_eq!(config.character.name, "bot");
    }
}
