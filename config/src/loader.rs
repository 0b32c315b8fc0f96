use crate::{AlidiskConfig, ConfigError};
use regex::Regex;
use std::path::PathBuf;

pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(config_dir) = dirs::home_dir() {
            search_paths.push(config_dir.join(".config/alidisk/alidisk.yaml"));
        }
        search_paths.push(PathBuf::from("./alidisk.yaml"));

        #[cfg(unix)]
        search_paths.insert(0, PathBuf::from("/etc/alidisk/alidisk.yaml"));

        Self {
            explicit_file: None,
            search_paths,
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Replaces the layered search locations.
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn load(&self) -> Result<AlidiskConfig, ConfigError> {
        let mut config = AlidiskConfig::default();

        let explicit = self
            .explicit_file
            .clone()
            .or_else(|| std::env::var_os("ALIDISK_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
                path: path.clone(),
                source: e,
            })?;
            config = self.parse_yaml(&content)?;
            tracing::debug!(path = %path.display(), "Loaded config");
        } else {
            for path in &self.search_paths {
                if path.exists() {
                    if let Ok(content) = std::fs::read_to_string(path) {
                        config = self.merge_yaml(&config, &content)?;
                        tracing::debug!(path = %path.display(), "Merged config");
                    }
                }
            }
        }

        self.apply_env_overrides(&mut config);
        Ok(config)
    }

    fn parse_yaml(&self, content: &str) -> Result<AlidiskConfig, ConfigError> {
        let expanded = self.expand_env_vars(content)?;
        if expanded.trim().is_empty() {
            return Ok(AlidiskConfig::default());
        }
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn merge_yaml(&self, base: &AlidiskConfig, content: &str) -> Result<AlidiskConfig, ConfigError> {
        let overlay = self.parse_yaml(content)?;
        Ok(self.merge_configs(base, &overlay))
    }

    fn merge_configs(&self, base: &AlidiskConfig, overlay: &AlidiskConfig) -> AlidiskConfig {
        let defaults = AlidiskConfig::default();
        let mut result = base.clone();

        if overlay.drive != defaults.drive {
            result.drive = overlay.drive.clone();
        }
        if overlay.shell != defaults.shell {
            result.shell = overlay.shell.clone();
        }
        if overlay.transfer != defaults.transfer {
            result.transfer = overlay.transfer.clone();
        }
        if overlay.logging != defaults.logging {
            result.logging = overlay.logging.clone();
        }

        result
    }

    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        Ok(re
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_default()
            })
            .to_string())
    }

    fn apply_env_overrides(&self, config: &mut AlidiskConfig) {
        if let Ok(endpoint) = std::env::var("ALIDISK_ENDPOINT") {
            if !endpoint.is_empty() {
                config.drive.endpoint = endpoint;
            }
        }
        if let Ok(token) = std::env::var("ALIDISK_REFRESH_TOKEN") {
            config.drive.refresh_token = token;
        }
        if let Ok(token) = std::env::var("ALIDISK_ACCESS_TOKEN") {
            config.drive.access_token = token;
        }
        if let Ok(drive_id) = std::env::var("ALIDISK_DRIVE_ID") {
            config.drive.drive_id = drive_id;
        }
        if let Ok(level) = std::env::var("ALIDISK_LOG_LEVEL") {
            if let Ok(l) = serde_yaml::from_str(&level) {
                config.logging.level = l;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;

    #[test]
    fn expand_env_vars_works() {
        std::env::set_var("ALIDISK_TEST_VAR_123", "hello");
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${ALIDISK_TEST_VAR_123}").unwrap();
        assert_eq!(result, "value: hello");
        std::env::remove_var("ALIDISK_TEST_VAR_123");
    }

    #[test]
    fn missing_env_var_becomes_empty() {
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${NONEXISTENT_VAR_XYZ}").unwrap();
        assert_eq!(result, "value: ");
    }

    #[test]
    fn env_overrides_config() {
        std::env::set_var("ALIDISK_LOG_LEVEL", "debug");
        let mut config = AlidiskConfig::default();
        ConfigLoader::new().apply_env_overrides(&mut config);
        assert_eq!(config.logging.level, LogLevel::Debug);
        std::env::remove_var("ALIDISK_LOG_LEVEL");
    }

    #[test]
    fn later_search_paths_override_earlier_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let system = tmp.path().join("system.yaml");
        let user = tmp.path().join("user.yaml");
        std::fs::write(&system, "transfer:\n  default_mode: overwrite\nshell:\n  prompt: 'sys> '\n").unwrap();
        std::fs::write(&user, "shell:\n  prompt: '{user}@{cwd} $ '\n").unwrap();

        let config = ConfigLoader::new()
            .with_search_paths(vec![system, tmp.path().join("absent.yaml"), user])
            .load()
            .unwrap();

        assert_eq!(config.transfer.default_mode, "overwrite");
        assert_eq!(config.shell.prompt, "{user}@{cwd} $ ");
    }

    #[test]
    fn explicit_file_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new()
            .with_file(tmp.path().join("nope.yaml"))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
