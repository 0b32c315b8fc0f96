use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{parse_duration, ConfigError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlidiskConfig {
    pub drive: DriveConfig,
    pub shell: ShellConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub endpoint: String,
    pub auth_endpoint: String,
    pub refresh_token: String,
    pub access_token: String,
    /// Where the session obtained from the refresh token is cached. Empty
    /// disables caching.
    pub token_file: String,
    pub drive_id: String,
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.aliyundrive.com".to_string(),
            auth_endpoint: "https://auth.aliyundrive.com".to_string(),
            refresh_token: String::new(),
            access_token: String::new(),
            token_file: "~/.config/alidisk/session.json".to_string(),
            drive_id: String::new(),
            timeout_secs: 30,
        }
    }
}

impl DriveConfig {
    pub fn token_file_path(&self) -> Option<PathBuf> {
        if self.token_file.trim().is_empty() {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(&self.token_file).as_ref()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Prompt template; `{user}` and `{cwd}` are substituted.
    pub prompt: String,
    pub history: HistoryConfig,
    pub completion: CompletionConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "{user} # ".to_string(),
            history: HistoryConfig::default(),
            completion: CompletionConfig::default(),
        }
    }
}

impl ShellConfig {
    pub fn render_prompt(&self, user: &str, cwd: &str) -> String {
        self.prompt.replace("{user}", user).replace("{cwd}", cwd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub capacity: usize,
    pub ttl: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            ttl: "10m".to_string(),
        }
    }
}

impl CompletionConfig {
    pub fn ttl(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.ttl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Folder names under the home directory checked, in order, for the
    /// default download destination.
    pub download_dirs: Vec<String>,
    /// Collision mode used when none is given: `auto_rename`, `refuse` or
    /// `overwrite`.
    pub default_mode: String,
    pub pacing: PacingConfig,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            download_dirs: ["download", "downloads", "Downloads", "Download"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_mode: "refuse".to_string(),
            pacing: PacingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub listing_delay: String,
    pub item_delay: String,
    pub retries: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            listing_delay: "5s".to_string(),
            item_delay: "1s".to_string(),
            retries: 2,
        }
    }
}

impl PacingConfig {
    pub fn listing_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.listing_delay)
    }

    pub fn item_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.item_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            filter: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
}
