use std::collections::HashSet;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::error::{QuotebookError, Result};

/// One configured persona: `key` names the source file (`<key>.txt`) and the
/// chat command, `name` is the display name shown to users.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PersonalityConfig {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_quotes_dir")]
    pub quotes_dir: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// General per-command cooldown window, in seconds.
    #[serde(default = "default_command_cooldown_secs")]
    pub command_cooldown_secs: u64,
    /// Specific-quote cooldown window, in minutes.
    #[serde(default = "default_specific_cooldown_mins")]
    pub specific_cooldown_mins: u64,
    #[serde(default = "default_personalities")]
    pub personalities: Vec<PersonalityConfig>,
}

fn default_db_path() -> String {
    "quotebook.db".to_string()
}

fn default_quotes_dir() -> String {
    "quotes".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_command_cooldown_secs() -> u64 {
    6
}

fn default_specific_cooldown_mins() -> u64 {
    15
}

fn default_personalities() -> Vec<PersonalityConfig> {
    vec![
        PersonalityConfig {
            key: "wgg".to_string(),
            name: "Weterani Gier Gacha".to_string(),
        },
        PersonalityConfig {
            key: "wriu".to_string(),
            name: "Wriu".to_string(),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self::convention_defaults()
    }
}

impl Config {
    pub fn convention_defaults() -> Self {
        Self {
            db_path: default_db_path(),
            quotes_dir: default_quotes_dir(),
            host: default_host(),
            port: default_port(),
            command_cooldown_secs: default_command_cooldown_secs(),
            specific_cooldown_mins: default_specific_cooldown_mins(),
            personalities: default_personalities(),
        }
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| QuotebookError::Config(format!("failed to read {path}: {e}")))?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| QuotebookError::Config(format!("failed to parse {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.personalities.is_empty() {
            return Err(QuotebookError::Config(
                "at least one personality must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for personality in &self.personalities {
            if personality.key.trim().is_empty() {
                return Err(QuotebookError::Config(
                    "personality key cannot be empty".to_string(),
                ));
            }
            if personality.name.trim().is_empty() {
                return Err(QuotebookError::Config(format!(
                    "personality {} has an empty display name",
                    personality.key
                )));
            }
            if !seen.insert(personality.key.as_str()) {
                return Err(QuotebookError::Config(format!(
                    "duplicate personality key: {}",
                    personality.key
                )));
            }
        }
        if self.command_cooldown_secs == 0 {
            return Err(QuotebookError::Config(
                "command_cooldown_secs must be positive".to_string(),
            ));
        }
        if self.specific_cooldown_mins == 0 {
            return Err(QuotebookError::Config(
                "specific_cooldown_mins must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convention_defaults_validate() {
        Config::convention_defaults().validate().unwrap();
    }

    #[test]
    fn rejects_duplicate_personality_keys() {
        let mut config = Config::convention_defaults();
        config.personalities.push(PersonalityConfig {
            key: "wgg".to_string(),
            name: "Duplicate".to_string(),
        });
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("duplicate personality key"));
    }

    #[test]
    fn rejects_zero_cooldown() {
        let mut config = Config::convention_defaults();
        config.command_cooldown_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_config_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"personalities": [{"key": "zultan", "name": "Zultan"}], "port": 8080}"#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.command_cooldown_secs, 6);
        assert_eq!(config.personalities.len(), 1);
        config.validate().unwrap();
    }
}
