use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use alidisk_sdk::{Account, CheckNameMode, DriveError, DriveResult, Entry, EntryKind, RemoteClient};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, REFERER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::error::{from_reqwest, from_response};
use crate::session::Session;
use crate::types::{
    decode_items, CreateRequest, CreateResponse, DownloadUrlResponse, ErrorResponse, FileItem,
    ItemsResponse, PartNumber, TokenResponse, UserResponse,
};

pub const DEFAULT_ENDPOINT: &str = "https://api.aliyundrive.com";
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://auth.aliyundrive.com";

const WEB_REFERER: &str = "https://www.aliyundrive.com/";
const PAGE_SIZE: u32 = 200;

pub struct DriveClient {
    client: Client,
    endpoint: String,
    auth_endpoint: String,
    token_file: Option<PathBuf>,
    session: RwLock<Session>,
}

impl DriveClient {
    pub fn new(endpoint: &str) -> DriveResult<Self> {
        Self::builder(endpoint).build()
    }

    pub fn builder(endpoint: &str) -> DriveClientBuilder {
        DriveClientBuilder::new(endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Makes sure an access token and drive id are available, exchanging the
    /// refresh token when needed, and caches the session on disk.
    pub async fn connect(&self) -> DriveResult<Account> {
        let session = self.session();
        if session.access_token.is_empty() {
            if session.refresh_token.is_empty() {
                return Err(DriveError::Unauthorized(
                    "no access token or refresh token configured".to_string(),
                ));
            }
            self.refresh().await?;
        }
        let account = self.account().await?;
        self.persist().await?;
        Ok(account)
    }

    fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_session(&self, f: impl FnOnce(&mut Session)) {
        f(&mut self.session.write().unwrap_or_else(PoisonError::into_inner));
    }

    async fn persist(&self) -> DriveResult<()> {
        match &self.token_file {
            Some(path) => self.session().save(path).await,
            None => Ok(()),
        }
    }

    async fn refresh(&self) -> DriveResult<()> {
        #[derive(Serialize)]
        struct RefreshRequest<'a> {
            grant_type: &'static str,
            refresh_token: &'a str,
        }

        let refresh_token = self.session().refresh_token;
        tracing::debug!("refreshing access token");
        let resp = self
            .client
            .post(format!("{}/v2/account/token", self.auth_endpoint))
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| from_reqwest(&e))?;

        let token: TokenResponse = Self::handle_response(resp).await?;
        self.update_session(|s| {
            s.access_token = token.access_token;
            s.refresh_token = token.refresh_token;
            if !token.user_name.is_empty() {
                s.user_name = token.user_name;
            }
            if s.drive_id.is_empty() {
                s.drive_id = token.default_drive_id;
            }
        });
        self.persist().await
    }

    fn drive_id(&self) -> String {
        self.session().drive_id
    }

    async fn send_post<B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> DriveResult<reqwest::Response> {
        let resp = self
            .client
            .post(format!("{}{}", self.endpoint, path))
            .bearer_auth(self.session().access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| from_reqwest(&e))?;

        if resp.status().as_u16() == 401 && !self.session().refresh_token.is_empty() {
            self.refresh().await?;
            return self
                .client
                .post(format!("{}{}", self.endpoint, path))
                .bearer_auth(self.session().access_token)
                .json(body)
                .send()
                .await
                .map_err(|e| from_reqwest(&e));
        }

        Ok(resp)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> DriveResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let resp = self.send_post(path, body).await?;
        Self::handle_response(resp).await
    }

    async fn post_empty<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> DriveResult<()> {
        let resp = self.send_post(path, body).await?;
        Self::handle_empty_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> DriveResult<T> {
        if !resp.status().is_success() {
            return Err(Self::extract_error(resp).await);
        }
        resp.json().await.map_err(|e| from_reqwest(&e))
    }

    async fn handle_empty_response(resp: reqwest::Response) -> DriveResult<()> {
        if !resp.status().is_success() {
            return Err(Self::extract_error(resp).await);
        }
        Ok(())
    }

    async fn extract_error(resp: reqwest::Response) -> DriveError {
        let status = resp.status().as_u16();
        match resp.json::<ErrorResponse>().await {
            Ok(err) => from_response(status, &err.code, err.message),
            Err(_) => from_response(status, "", "unknown error".to_string()),
        }
    }

    async fn get_entry(&self, id: &str) -> DriveResult<Entry> {
        #[derive(Serialize)]
        struct GetRequest<'a> {
            drive_id: &'a str,
            file_id: &'a str,
        }

        let item: FileItem = self
            .post(
                "/v2/file/get",
                &GetRequest {
                    drive_id: &self.drive_id(),
                    file_id: id,
                },
            )
            .await?;
        Entry::try_from(item).map_err(|item| {
            DriveError::Serialization(format!("unknown entry type '{}'", item.kind))
        })
    }

    async fn transfer(
        &self,
        endpoint: &str,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        #[derive(Serialize)]
        struct TransferRequest<'a> {
            drive_id: &'a str,
            file_id: &'a str,
            to_drive_id: &'a str,
            to_parent_file_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            new_name: Option<&'a str>,
        }

        let drive_id = self.drive_id();
        self.post_empty(
            endpoint,
            &TransferRequest {
                drive_id: &drive_id,
                file_id: id,
                to_drive_id: &drive_id,
                to_parent_file_id: to_parent_id,
                new_name,
            },
        )
        .await
    }

    async fn create(&self, request: &CreateRequest<'_>) -> DriveResult<CreateResponse> {
        self.post("/adrive/v2/file/createWithFolders", request).await
    }
}

/// Writes the response body to `path`, failing when it ends short of
/// `expected` bytes.
async fn stream_to_file(
    resp: &mut reqwest::Response,
    path: &Path,
    expected: Option<u64>,
) -> DriveResult<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = resp.chunk().await.map_err(|e| from_reqwest(&e))? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    match expected {
        Some(size) if size != written => Err(DriveError::Transient(format!(
            "download ended after {written} of {size} bytes"
        ))),
        _ => Ok(()),
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[async_trait]
impl RemoteClient for DriveClient {
    async fn account(&self) -> DriveResult<Account> {
        let session = self.session();
        if !session.user_name.is_empty() && !session.drive_id.is_empty() {
            return Ok(Account {
                user_name: session.user_name,
                drive_id: session.drive_id,
            });
        }

        let user: UserResponse = self.post("/v2/user/get", &serde_json::json!({})).await?;
        let user_name = if user.user_name.is_empty() {
            user.nick_name
        } else {
            user.user_name
        };
        self.update_session(|s| {
            s.user_name.clone_from(&user_name);
            if s.drive_id.is_empty() {
                s.drive_id = user.default_drive_id;
            }
        });
        Ok(Account {
            user_name,
            drive_id: self.drive_id(),
        })
    }

    async fn list_children(&self, parent_id: &str) -> DriveResult<Vec<Entry>> {
        #[derive(Serialize)]
        struct ListRequest<'a> {
            drive_id: &'a str,
            parent_file_id: &'a str,
            limit: u32,
            #[serde(skip_serializing_if = "str::is_empty")]
            marker: &'a str,
            order_by: &'static str,
            order_direction: &'static str,
        }

        let drive_id = self.drive_id();
        let mut entries = Vec::new();
        let mut marker = String::new();
        loop {
            let page: ItemsResponse = self
                .post(
                    "/adrive/v3/file/list",
                    &ListRequest {
                        drive_id: &drive_id,
                        parent_file_id: parent_id,
                        limit: PAGE_SIZE,
                        marker: &marker,
                        order_by: "name",
                        order_direction: "ASC",
                    },
                )
                .await?;
            entries.extend(decode_items(page.items));
            if page.next_marker.is_empty() {
                break;
            }
            marker = page.next_marker;
        }
        Ok(entries)
    }

    async fn find_by_path(&self, path: &str, kind: EntryKind) -> DriveResult<Option<Entry>> {
        #[derive(Serialize)]
        struct ByPathRequest<'a> {
            drive_id: &'a str,
            file_path: &'a str,
        }

        let result: DriveResult<FileItem> = self
            .post(
                "/v2/file/get_by_path",
                &ByPathRequest {
                    drive_id: &self.drive_id(),
                    file_path: &normalize_path(path),
                },
            )
            .await;
        match result {
            Ok(item) => Ok(Entry::try_from(item).ok().filter(|e| e.kind == kind)),
            Err(DriveError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn path_chain(&self, id: &str) -> DriveResult<Vec<Entry>> {
        #[derive(Serialize)]
        struct PathRequest<'a> {
            drive_id: &'a str,
            file_id: &'a str,
        }

        let resp: ItemsResponse = self
            .post(
                "/adrive/v1/file/get_path",
                &PathRequest {
                    drive_id: &self.drive_id(),
                    file_id: id,
                },
            )
            .await?;
        // The provider lists the entry first and its top-level ancestor last.
        let mut chain = decode_items(resp.items);
        chain.reverse();
        Ok(chain)
    }

    async fn move_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        self.transfer("/v2/file/move", id, to_parent_id, new_name).await
    }

    async fn copy_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        self.transfer("/v2/file/copy", id, to_parent_id, new_name).await
    }

    async fn trash(&self, id: &str) -> DriveResult<()> {
        #[derive(Serialize)]
        struct TrashRequest<'a> {
            drive_id: &'a str,
            file_id: &'a str,
        }

        self.post_empty(
            "/v2/recyclebin/trash",
            &TrashRequest {
                drive_id: &self.drive_id(),
                file_id: id,
            },
        )
        .await
    }

    async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        let created = self
            .create(&CreateRequest {
                drive_id: &self.drive_id(),
                parent_file_id: parent_id,
                name,
                kind: "folder",
                check_name_mode: mode,
                size: None,
                part_info_list: Vec::new(),
            })
            .await?;
        let name = if created.file_name.is_empty() {
            name.to_string()
        } else {
            created.file_name
        };
        Ok(Entry::folder(created.file_id, name))
    }

    async fn upload_file(
        &self,
        local: &Path,
        parent_id: &str,
        name: Option<&str>,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        #[derive(Serialize)]
        struct CompleteRequest<'a> {
            drive_id: &'a str,
            file_id: &'a str,
            upload_id: &'a str,
        }

        let size = tokio::fs::metadata(local).await?.len();
        let name = match name {
            Some(name) => name.to_string(),
            None => local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| DriveError::invalid_argument(local.display().to_string()))?,
        };
        let drive_id = self.drive_id();

        let created = self
            .create(&CreateRequest {
                drive_id: &drive_id,
                parent_file_id: parent_id,
                name: &name,
                kind: "file",
                check_name_mode: mode,
                size: Some(size),
                part_info_list: vec![PartNumber { part_number: 1 }],
            })
            .await?;
        let remote_name = if created.file_name.is_empty() {
            name.clone()
        } else {
            created.file_name.clone()
        };

        if created.rapid_upload {
            tracing::debug!(name = %remote_name, "rapid upload matched existing content");
            return Ok(Entry::file(created.file_id, remote_name, size));
        }
        let Some(upload_id) = created.upload_id.as_deref() else {
            if created.exist {
                return Err(DriveError::already_exists(name));
            }
            return Err(DriveError::Serialization("missing upload_id".to_string()));
        };
        let upload_url = created
            .part_info_list
            .first()
            .map(|part| part.upload_url.as_str())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DriveError::Serialization("missing upload_url".to_string()))?;

        let file = tokio::fs::File::open(local).await?;
        let resp = self
            .client
            .put(upload_url)
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| from_reqwest(&e))?;
        Self::handle_empty_response(resp).await?;

        self.post_empty(
            "/v2/file/complete",
            &CompleteRequest {
                drive_id: &drive_id,
                file_id: &created.file_id,
                upload_id,
            },
        )
        .await?;

        tracing::info!(name = %remote_name, size, "uploaded");
        Ok(Entry::file(created.file_id, remote_name, size))
    }

    async fn download_file(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf> {
        #[derive(Serialize)]
        struct DownloadRequest<'a> {
            drive_id: &'a str,
            file_id: &'a str,
        }

        let entry = self.get_entry(id).await?;
        if !entry.is_file() {
            return Err(DriveError::invalid_argument(format!("{} is a folder", entry.name)));
        }

        let link: DownloadUrlResponse = self
            .post(
                "/v2/file/get_download_url",
                &DownloadRequest {
                    drive_id: &self.drive_id(),
                    file_id: id,
                },
            )
            .await?;

        let mut resp = self
            .client
            .get(&link.url)
            .header(REFERER, WEB_REFERER)
            .send()
            .await
            .map_err(|e| from_reqwest(&e))?;
        if !resp.status().is_success() {
            return Err(Self::extract_error(resp).await);
        }

        tokio::fs::create_dir_all(local_dir).await?;
        let target = local_dir.join(&entry.name);
        let partial = local_dir.join(format!("{}.part", entry.name));
        if let Err(e) = stream_to_file(&mut resp, &partial, entry.size).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                tracing::debug!(path = %partial.display(), error = %cleanup, "could not remove partial download");
            }
            return Err(e);
        }
        tokio::fs::rename(&partial, &target).await?;

        tracing::info!(name = %entry.name, path = %target.display(), "downloaded");
        Ok(target)
    }

    async fn logout(&self) -> DriveResult<()> {
        self.update_session(|s| *s = Session::default());
        match &self.token_file {
            Some(path) => Session::remove(path).await,
            None => Ok(()),
        }
    }
}

pub struct DriveClientBuilder {
    endpoint: String,
    auth_endpoint: String,
    timeout: Duration,
    access_token: Option<String>,
    refresh_token: Option<String>,
    drive_id: Option<String>,
    token_file: Option<PathBuf>,
}

impl DriveClientBuilder {
    fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            access_token: None,
            refresh_token: None,
            drive_id: None,
            token_file: None,
        }
    }

    pub fn auth_endpoint(mut self, endpoint: &str) -> Self {
        self.auth_endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn drive_id(mut self, drive_id: impl Into<String>) -> Self {
        self.drive_id = Some(drive_id.into());
        self
    }

    /// Session cache read at build time and rewritten after token refreshes.
    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    pub fn build(self) -> DriveResult<DriveClient> {
        let mut session = match &self.token_file {
            Some(path) => Session::load(path)?.unwrap_or_default(),
            None => Session::default(),
        };
        if let Some(token) = self.access_token.filter(|t| !t.is_empty()) {
            session.access_token = token;
        }
        if let Some(token) = self.refresh_token.filter(|t| !t.is_empty()) {
            session.refresh_token = token;
        }
        if let Some(drive_id) = self.drive_id.filter(|d| !d.is_empty()) {
            session.drive_id = drive_id;
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("alidisk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DriveError::Connection(e.to_string()))?;

        Ok(DriveClient {
            client,
            endpoint: self.endpoint,
            auth_endpoint: self.auth_endpoint,
            token_file: self.token_file,
            session: RwLock::new(session),
        })
    }
}
