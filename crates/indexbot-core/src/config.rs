//! Bot configuration
//!
//! Loaded from `~/.config/indexbot/config.toml` (or an explicit path). Every
//! key is optional; missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::channel::telegram::default_polling_timeout;

const DEFAULT_URL_PREFIX: &str = "https://";
const DEFAULT_INTERACTION_TTL_SECS: u64 = 60;
const MAX_HELP_LINKS: usize = 8;
/// One week.
const MAX_INTERACTION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("wizard.url_prefix must not be empty")]
    EmptyUrlPrefix,
    #[error("wizard.interaction_ttl_secs must be greater than zero")]
    ZeroTtl,
    #[error("wizard.interaction_ttl_secs is {0}, at most 604800 (one week) is allowed")]
    TtlTooLarge(u64),
    #[error("help.links holds {0} links, at most 8 fit in one row")]
    TooManyHelpLinks(usize),
}

/// Top-level bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub wizard: WizardSettings,
    #[serde(default)]
    pub help: HelpSettings,
    /// User ids allowed to manage banned words from chat
    #[serde(default)]
    pub admin_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot token; INDEXBOT_BOT_TOKEN or --token take precedence
    pub bot_token: Option<String>,
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout: u32,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            polling_timeout: default_polling_timeout(),
        }
    }
}

/// AddIndex wizard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSettings {
    /// Links must start with this; it is stripped before storage
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Seconds a pending interaction stays alive after its last advance
    #[serde(default = "default_interaction_ttl_secs")]
    pub interaction_ttl_secs: u64,
}

fn default_url_prefix() -> String {
    DEFAULT_URL_PREFIX.to_string()
}

fn default_interaction_ttl_secs() -> u64 {
    DEFAULT_INTERACTION_TTL_SECS
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            url_prefix: default_url_prefix(),
            interaction_ttl_secs: default_interaction_ttl_secs(),
        }
    }
}

impl WizardSettings {
    pub fn ttl_ms(&self) -> i64 {
        i64::try_from(self.interaction_ttl_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpLink {
    pub label: String,
    pub url: String,
}

impl HelpLink {
    fn new(label: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

/// Link buttons shown under the help text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpSettings {
    #[serde(default = "default_help_links")]
    pub links: Vec<HelpLink>,
}

fn default_help_links() -> Vec<HelpLink> {
    vec![
        HelpLink::new("Author", "https://t.me/dwgoing"),
        HelpLink::new("Website", "https://www.baidu.com"),
        HelpLink::new("Channel", "https://t.me/joinchat/TwyRY8jYiCO7S-3x"),
        HelpLink::new("Group", "https://t.me/joinchat/IrgTkeoOSCEvUOj1"),
    ]
}

impl Default for HelpSettings {
    fn default() -> Self {
        Self {
            links: default_help_links(),
        }
    }
}

impl BotConfig {
    /// Load from the default path, or defaults when there is no file.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// ~/.config/indexbot/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("indexbot").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wizard.url_prefix.is_empty() {
            return Err(ConfigError::EmptyUrlPrefix);
        }
        if self.wizard.interaction_ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.wizard.interaction_ttl_secs > MAX_INTERACTION_TTL_SECS {
            return Err(ConfigError::TtlTooLarge(self.wizard.interaction_ttl_secs));
        }
        if self.help.links.len() > MAX_HELP_LINKS {
            return Err(ConfigError::TooManyHelpLinks(self.help.links.len()));
        }
        Ok(())
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == user_id)
    }
}
