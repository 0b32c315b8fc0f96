use alidisk_sdk::{CheckNameMode, Entry, EntryKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FileItem {
    pub file_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TryFrom<FileItem> for Entry {
    type Error = FileItem;

    fn try_from(item: FileItem) -> Result<Self, Self::Error> {
        let kind = match item.kind.as_str() {
            "file" => EntryKind::File,
            "folder" => EntryKind::Folder,
            _ => return Err(item),
        };
        Ok(Self {
            id: item.file_id,
            name: item.name,
            kind,
            size: item.size,
        })
    }
}

/// Decodes a raw item list, skipping records that lack required fields or
/// carry an unknown type.
pub(crate) fn decode_items(items: Vec<serde_json::Value>) -> Vec<Entry> {
    items
        .into_iter()
        .filter_map(|value| serde_json::from_value::<FileItem>(value).ok())
        .filter_map(|item| Entry::try_from(item).ok())
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_marker: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub nick_name: String,
    pub default_drive_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub default_drive_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PartNumber {
    pub part_number: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRequest<'a> {
    pub drive_id: &'a str,
    pub parent_file_id: &'a str,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_name_mode: Option<CheckNameMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub part_info_list: Vec<PartNumber>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadPart {
    #[serde(default)]
    pub upload_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateResponse {
    pub file_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub exist: bool,
    #[serde(default)]
    pub rapid_upload: bool,
    #[serde(default)]
    pub part_info_list: Vec<UploadPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadUrlResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_skips_malformed_items() {
        let entries = decode_items(vec![
            json!({"file_id": "1", "name": "a.txt", "type": "file", "size": 12}),
            json!({"file_id": "2", "type": "folder"}),
            json!({"file_id": "3", "name": "album", "type": "album"}),
            json!({"file_id": "4", "name": "docs", "type": "folder"}),
        ]);
        assert_eq!(
            entries,
            vec![Entry::file("1", "a.txt", 12), Entry::folder("4", "docs")]
        );
    }

    #[test]
    fn create_request_omits_server_default_mode() {
        let body = serde_json::to_value(CreateRequest {
            drive_id: "d",
            parent_file_id: "root",
            name: "x",
            kind: "folder",
            check_name_mode: None,
            size: None,
            part_info_list: Vec::new(),
        })
        .unwrap();
        assert!(body.get("check_name_mode").is_none());
        assert!(body.get("part_info_list").is_none());

        let body = serde_json::to_value(CreateRequest {
            drive_id: "d",
            parent_file_id: "root",
            name: "x",
            kind: "file",
            check_name_mode: Some(CheckNameMode::AutoRename),
            size: Some(3),
            part_info_list: vec![PartNumber { part_number: 1 }],
        })
        .unwrap();
        assert_eq!(body["check_name_mode"], "auto_rename");
        assert_eq!(body["part_info_list"][0]["part_number"], 1);
    }
}
