//! alidisk configuration
//!
//! # Configuration Loading Priority
//!
//! 1. Compiled-in defaults
//! 2. `/etc/alidisk/alidisk.yaml` (system-wide)
//! 3. `~/.config/alidisk/alidisk.yaml` (user)
//! 4. `./alidisk.yaml` (project-local)
//! 5. `--config <file>` or `ALIDISK_CONFIG=/path/to/config.yaml` (explicit, replaces 2-4)
//! 6. Environment variables (highest priority)
//!
//! # Example Configuration
//!
//! ```yaml
//! drive:
//!   refresh_token: "${ALIYUN_REFRESH_TOKEN}"
//!   token_file: "~/.config/alidisk/session.json"
//!
//! shell:
//!   prompt: "{user}:{cwd} # "
//!
//! transfer:
//!   default_mode: auto_rename
//!   pacing:
//!     listing_delay: 5s
//!     item_delay: 500ms
//!     retries: 2
//!
//! logging:
//!   level: info
//! ```

#![allow(missing_docs)]

use std::time::Duration;

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::*;

/// Load configuration from default locations.
///
/// Searches for config files in order and merges them.
/// Environment variables override file values.
pub fn load() -> Result<AlidiskConfig, ConfigError> {
    ConfigLoader::new().load()
}

/// Load configuration from a specific file.
pub fn load_from_file(path: &str) -> Result<AlidiskConfig, ConfigError> {
    ConfigLoader::new().with_file(path).load()
}

/// Parses `"250ms"`, `"5s"`, `"2m"`, `"1h"` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(value.to_string()))?;

    match unit.trim() {
        "ms" => Ok(Duration::from_millis(amount)),
        "" | "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount * 60)),
        "h" => Ok(Duration::from_secs(amount * 3600)),
        _ => Err(ConfigError::InvalidDuration(value.to_string())),
    }
}
