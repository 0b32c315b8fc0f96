use std::path::Path;

use alidisk_sdk::{DriveError, DriveResult};
use serde::{Deserialize, Serialize};

/// Credentials and account facts cached between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_name: String,
    pub drive_id: String,
}

impl Session {
    /// Reads a cached session, returning `None` when the file is absent.
    pub fn load(path: &Path) -> DriveResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| DriveError::Serialization(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> DriveResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(self)
            .map_err(|e| DriveError::Serialization(e.to_string()))?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub async fn remove(path: &Path) -> DriveResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
