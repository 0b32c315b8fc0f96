//! Maps virtual paths to remote entries.

use std::sync::Arc;

use alidisk_sdk::{EntryKind, RemoteClient, ROOT_ID, ROOT_NAME};

/// What an absolute virtual path denotes on the drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File(String),
    Folder(String),
    Missing,
}

impl Resolved {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::File(id) | Self::Folder(id) => Some(id),
            Self::Missing => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }
}

/// `/` and `/Default` both name the drive root.
pub fn is_root(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    trimmed.is_empty() || trimmed.strip_prefix('/') == Some(ROOT_NAME)
}

#[derive(Clone)]
pub struct PathResolver {
    client: Arc<dyn RemoteClient>,
}

impl PathResolver {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    /// Resolves an absolute path. A path that is both a file and a folder
    /// resolves to the file. Lookup failures resolve to [`Resolved::Missing`].
    pub async fn resolve(&self, path: &str) -> Resolved {
        if is_root(path) {
            return Resolved::Folder(ROOT_ID.to_string());
        }
        if let Some(id) = self.lookup_kind(path, EntryKind::File).await {
            return Resolved::File(id);
        }
        if let Some(id) = self.lookup_kind(path, EntryKind::Folder).await {
            return Resolved::Folder(id);
        }
        tracing::debug!(path, "path not found");
        Resolved::Missing
    }

    pub async fn folder_id(&self, path: &str) -> Option<String> {
        if is_root(path) {
            return Some(ROOT_ID.to_string());
        }
        let id = self.lookup_kind(path, EntryKind::Folder).await;
        if id.is_none() {
            tracing::debug!(path, "folder not found");
        }
        id
    }

    async fn lookup_kind(&self, path: &str, kind: EntryKind) -> Option<String> {
        match self.client.find_by_path(path, kind).await {
            Ok(entry) => entry.map(|e| e.id),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                tracing::warn!(path, kind = kind.as_str(), error = %e, "path lookup failed");
                None
            }
        }
    }
}
