use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DriveError;

/// Well-known id of the drive root.
pub const ROOT_ID: &str = "root";

/// Name some providers report for the drive root in path chains.
pub const ROOT_NAME: &str = "Default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder)
    }

    /// Type column used by `ls`.
    #[must_use]
    pub fn symbol(&self) -> char {
        match self {
            Self::File => '-',
            Self::Folder => 'd',
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

/// A remote file or folder record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
}

impl Entry {
    #[must_use]
    pub fn file(id: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::File,
            size: Some(size),
        }
    }

    #[must_use]
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Folder,
            size: None,
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

/// Server-side naming-collision policy for create and upload calls.
///
/// `Option<CheckNameMode>::None` leaves the decision to the server default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckNameMode {
    AutoRename,
    Refuse,
    Overwrite,
}

impl CheckNameMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoRename => "auto_rename",
            Self::Refuse => "refuse",
            Self::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for CheckNameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckNameMode {
    type Err = DriveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_rename" | "auto-rename" | "rename" => Ok(Self::AutoRename),
            "refuse" => Ok(Self::Refuse),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(DriveError::invalid_argument(format!(
                "unknown check name mode '{other}'"
            ))),
        }
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_name: String,
    pub drive_id: String,
}
