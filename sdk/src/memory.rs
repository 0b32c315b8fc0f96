use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{DriveError, DriveResult};
use crate::remote::{upload_tree, RemoteClient};
use crate::types::{Account, CheckNameMode, Entry, EntryKind, ROOT_ID, ROOT_NAME};

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<String>,
    kind: EntryKind,
    content: Bytes,
}

impl Node {
    fn to_entry(&self, id: &str) -> Entry {
        Entry {
            id: id.to_string(),
            name: self.name.clone(),
            kind: self.kind,
            size: self.kind.is_file().then(|| self.content.len() as u64),
        }
    }
}

#[derive(Default)]
struct State {
    nodes: HashMap<String, Node>,
    trash: Vec<String>,
    calls: Vec<String>,
    failures: HashMap<&'static str, VecDeque<DriveError>>,
    logged_out: bool,
}

enum Placement {
    Fresh(String),
    Reuse(String),
}

/// An id-addressed drive held entirely in memory.
///
/// Every trait call is recorded (see [`MemoryDrive::calls`]) and failures can
/// be queued per operation with [`MemoryDrive::fail_next`], which makes it
/// the test double for the shell as well as an offline backend.
pub struct MemoryDrive {
    state: Mutex<State>,
    next_id: AtomicU64,
    user_name: String,
}

impl Default for MemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDrive {
    #[must_use]
    pub fn new() -> Self {
        Self::with_user("offline")
    }

    #[must_use]
    pub fn with_user(user_name: &str) -> Self {
        let mut state = State::default();
        state.nodes.insert(
            ROOT_ID.to_string(),
            Node {
                name: ROOT_NAME.to_string(),
                parent: None,
                kind: EntryKind::Folder,
                content: Bytes::new(),
            },
        );
        Self {
            state: Mutex::new(state),
            next_id: AtomicU64::new(1),
            user_name: user_name.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn alloc_id(&self) -> String {
        format!("m{:06}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates every missing folder along `path` and returns the last id.
    pub fn mkdir_p(&self, path: &str) -> String {
        let mut state = self.lock();
        let mut current = ROOT_ID.to_string();
        for segment in segments(path) {
            current = match child_named(&state, &current, segment) {
                Some(id) if state.nodes[&id].kind.is_folder() => id,
                _ => {
                    let id = self.alloc_id();
                    state.nodes.insert(
                        id.clone(),
                        Node {
                            name: segment.to_string(),
                            parent: Some(current),
                            kind: EntryKind::Folder,
                            content: Bytes::new(),
                        },
                    );
                    id
                }
            };
        }
        current
    }

    /// Writes a file at `path`, creating parents and replacing any file
    /// already there.
    pub fn put_file(&self, path: &str, content: impl Into<Bytes>) -> String {
        let (parent, name) = split_parent(path);
        let parent_id = self.mkdir_p(parent);
        let mut state = self.lock();
        if let Some(id) = child_named(&state, &parent_id, name) {
            if let Some(node) = state.nodes.get_mut(&id) {
                node.content = content.into();
            }
            return id;
        }
        let id = self.alloc_id();
        state.nodes.insert(
            id.clone(),
            Node {
                name: name.to_string(),
                parent: Some(parent_id),
                kind: EntryKind::File,
                content: content.into(),
            },
        );
        id
    }

    /// Content of the file at `path`, if one exists.
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Bytes> {
        let state = self.lock();
        let id = lookup(&state, path)?;
        let node = &state.nodes[&id];
        node.kind.is_file().then(|| node.content.clone())
    }

    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        lookup(&self.lock(), path).is_some()
    }

    /// Names of entries sent to the recycle bin, in order.
    #[must_use]
    pub fn trashed(&self) -> Vec<String> {
        self.lock().trash.clone()
    }

    /// Recorded trait calls as `"<op> <detail>"` strings.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Makes the next call to `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: DriveError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    #[must_use]
    pub fn is_logged_out(&self) -> bool {
        self.lock().logged_out
    }

    fn record(&self, op: &'static str, detail: impl Into<String>) -> DriveResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("{op} {}", detail.into()));
        match state.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn folder_node<'a>(state: &'a State, id: &str) -> DriveResult<&'a Node> {
        match state.nodes.get(id) {
            Some(node) if node.kind.is_folder() => Ok(node),
            _ => Err(DriveError::not_found(id.to_string())),
        }
    }

    fn place(
        state: &State,
        parent_id: &str,
        name: &str,
        kind: EntryKind,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Placement> {
        let Some(existing) = child_named(state, parent_id, name) else {
            return Ok(Placement::Fresh(name.to_string()));
        };
        let existing_kind = state.nodes[&existing].kind;
        match (mode, existing_kind == kind) {
            (Some(CheckNameMode::Refuse), true) if kind.is_folder() => {
                Ok(Placement::Reuse(existing))
            }
            (Some(CheckNameMode::Refuse), _) => Err(DriveError::already_exists(name.to_string())),
            (Some(CheckNameMode::Overwrite), true) => Ok(Placement::Reuse(existing)),
            _ => Ok(Placement::Fresh(free_name(state, parent_id, name))),
        }
    }

    fn insert(&self, state: &mut State, parent_id: &str, name: String, node: Node) -> Entry {
        let id = self.alloc_id();
        let node = Node {
            name,
            parent: Some(parent_id.to_string()),
            ..node
        };
        let entry = node.to_entry(&id);
        state.nodes.insert(id, node);
        entry
    }

    fn copy_subtree(&self, state: &mut State, id: &str, to_parent: &str, name: String) {
        let Some(node) = state.nodes.get(id).cloned() else {
            return;
        };
        let copied = self.insert(state, to_parent, name, node);
        for child in children_of(state, id) {
            let child_name = state.nodes[&child].name.clone();
            self.copy_subtree(state, &child, &copied.id, child_name);
        }
    }

    fn transfer(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
        copy: bool,
    ) -> DriveResult<()> {
        let mut state = self.lock();
        Self::folder_node(&state, to_parent_id)?;
        let node = state
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| DriveError::not_found(id.to_string()))?;
        if id == ROOT_ID || is_ancestor(&state, id, to_parent_id) {
            return Err(DriveError::invalid_argument(format!(
                "cannot place {} inside itself",
                node.name
            )));
        }

        let name = new_name.map_or_else(|| node.name.clone(), str::to_string);
        if let Some(existing) = child_named(&state, to_parent_id, &name) {
            if existing != id {
                if state.nodes[&existing].kind.is_folder() {
                    return Err(DriveError::already_exists(name));
                }
                remove_subtree(&mut state, &existing);
            }
        }

        if copy {
            self.copy_subtree(&mut state, id, to_parent_id, name);
        } else if let Some(moved) = state.nodes.get_mut(id) {
            moved.parent = Some(to_parent_id.to_string());
            moved.name = name;
        }
        Ok(())
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn split_parent(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", trimmed),
    }
}

fn children_of(state: &State, parent_id: &str) -> Vec<String> {
    let mut ids: Vec<&String> = state
        .nodes
        .iter()
        .filter(|(_, node)| node.parent.as_deref() == Some(parent_id))
        .map(|(id, _)| id)
        .collect();
    ids.sort_by(|a, b| state.nodes[*a].name.cmp(&state.nodes[*b].name));
    ids.into_iter().cloned().collect()
}

fn child_named(state: &State, parent_id: &str, name: &str) -> Option<String> {
    state
        .nodes
        .iter()
        .find(|(_, node)| node.parent.as_deref() == Some(parent_id) && node.name == name)
        .map(|(id, _)| id.clone())
}

fn lookup(state: &State, path: &str) -> Option<String> {
    let mut current = ROOT_ID.to_string();
    for segment in segments(path) {
        current = child_named(state, &current, segment)?;
    }
    Some(current)
}

fn is_ancestor(state: &State, ancestor: &str, id: &str) -> bool {
    let mut current = Some(id.to_string());
    while let Some(cur) = current {
        if cur == ancestor {
            return true;
        }
        current = state.nodes.get(&cur).and_then(|n| n.parent.clone());
    }
    false
}

fn remove_subtree(state: &mut State, id: &str) {
    for child in children_of(state, id) {
        remove_subtree(state, &child);
    }
    state.nodes.remove(id);
}

fn free_name(state: &State, parent_id: &str, name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };
    (1..)
        .map(|n| format!("{stem}({n}){ext}"))
        .find(|candidate| child_named(state, parent_id, candidate).is_none())
        .unwrap_or_else(|| name.to_string())
}

#[async_trait]
impl RemoteClient for MemoryDrive {
    async fn account(&self) -> DriveResult<Account> {
        self.record("account", "")?;
        Ok(Account {
            user_name: self.user_name.clone(),
            drive_id: "memory".to_string(),
        })
    }

    async fn list_children(&self, parent_id: &str) -> DriveResult<Vec<Entry>> {
        self.record("list_children", parent_id)?;
        let state = self.lock();
        Self::folder_node(&state, parent_id)?;
        Ok(children_of(&state, parent_id)
            .iter()
            .map(|id| state.nodes[id].to_entry(id))
            .collect())
    }

    async fn find_by_path(&self, path: &str, kind: EntryKind) -> DriveResult<Option<Entry>> {
        self.record("find_by_path", format!("{path} {}", kind.as_str()))?;
        let state = self.lock();
        Ok(lookup(&state, path)
            .map(|id| state.nodes[&id].to_entry(&id))
            .filter(|entry| entry.kind == kind))
    }

    async fn path_chain(&self, id: &str) -> DriveResult<Vec<Entry>> {
        self.record("path_chain", id)?;
        let state = self.lock();
        let mut chain = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(cur) = current {
            let node = state
                .nodes
                .get(&cur)
                .ok_or_else(|| DriveError::not_found(cur.clone()))?;
            chain.push(node.to_entry(&cur));
            current = node.parent.clone();
        }
        chain.reverse();
        Ok(chain)
    }

    async fn move_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        self.record("move_entry", format!("{id} {to_parent_id}"))?;
        self.transfer(id, to_parent_id, new_name, false)
    }

    async fn copy_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        self.record("copy_entry", format!("{id} {to_parent_id}"))?;
        self.transfer(id, to_parent_id, new_name, true)
    }

    async fn trash(&self, id: &str) -> DriveResult<()> {
        self.record("trash", id)?;
        if id == ROOT_ID {
            return Err(DriveError::invalid_argument("cannot trash the drive root"));
        }
        let mut state = self.lock();
        let name = state
            .nodes
            .get(id)
            .map(|n| n.name.clone())
            .ok_or_else(|| DriveError::not_found(id.to_string()))?;
        remove_subtree(&mut state, id);
        state.trash.push(name);
        Ok(())
    }

    async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        self.record("create_folder", format!("{parent_id} {name}"))?;
        let mut state = self.lock();
        Self::folder_node(&state, parent_id)?;
        match Self::place(&state, parent_id, name, EntryKind::Folder, mode)? {
            Placement::Reuse(id) => Ok(state.nodes[&id].to_entry(&id)),
            Placement::Fresh(name) => Ok(self.insert(
                &mut state,
                parent_id,
                name,
                Node {
                    name: String::new(),
                    parent: None,
                    kind: EntryKind::Folder,
                    content: Bytes::new(),
                },
            )),
        }
    }

    async fn upload_file(
        &self,
        local: &Path,
        parent_id: &str,
        name: Option<&str>,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        self.record("upload_file", format!("{} {parent_id}", local.display()))?;
        let content = Bytes::from(tokio::fs::read(local).await?);
        let name = match name {
            Some(name) => name.to_string(),
            None => local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| DriveError::invalid_argument(local.display().to_string()))?,
        };

        let mut state = self.lock();
        Self::folder_node(&state, parent_id)?;
        match Self::place(&state, parent_id, &name, EntryKind::File, mode)? {
            Placement::Reuse(id) => {
                let node = state
                    .nodes
                    .get_mut(&id)
                    .ok_or_else(|| DriveError::not_found(id.clone()))?;
                node.content = content;
                Ok(node.to_entry(&id))
            }
            Placement::Fresh(name) => Ok(self.insert(
                &mut state,
                parent_id,
                name,
                Node {
                    name: String::new(),
                    parent: None,
                    kind: EntryKind::File,
                    content,
                },
            )),
        }
    }

    async fn upload_files(
        &self,
        locals: &[PathBuf],
        parent_id: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Vec<Entry>> {
        self.record("upload_files", format!("{} {parent_id}", locals.len()))?;
        let mut uploaded = Vec::with_capacity(locals.len());
        for local in locals {
            uploaded.push(self.upload_file(local, parent_id, None, mode).await?);
        }
        Ok(uploaded)
    }

    async fn upload_folder(
        &self,
        local: &Path,
        parent_id: &str,
        mode: Option<CheckNameMode>,
        folder_mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        self.record("upload_folder", format!("{} {parent_id}", local.display()))?;
        upload_tree(self, local, parent_id, mode, folder_mode).await
    }

    async fn download_file(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf> {
        self.record("download_file", id)?;
        let node = {
            let state = self.lock();
            state
                .nodes
                .get(id)
                .filter(|n| n.kind.is_file())
                .cloned()
                .ok_or_else(|| DriveError::not_found(id.to_string()))?
        };
        tokio::fs::create_dir_all(local_dir).await?;
        let target = local_dir.join(&node.name);
        tokio::fs::write(&target, &node.content).await?;
        Ok(target)
    }

    async fn logout(&self) -> DriveResult<()> {
        self.record("logout", "")?;
        self.lock().logged_out = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_by_path_respects_kind() {
        let drive = MemoryDrive::new();
        drive.put_file("/docs/a.txt", "hello");

        let file = drive.find_by_path("/docs/a.txt", EntryKind::File).await.unwrap();
        assert_eq!(file.unwrap().size, Some(5));
        assert!(drive
            .find_by_path("/docs/a.txt", EntryKind::Folder)
            .await
            .unwrap()
            .is_none());
        assert!(drive
            .find_by_path("/docs", EntryKind::Folder)
            .await
            .unwrap()
            .is_some());
        assert!(drive
            .find_by_path("/nope", EntryKind::File)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn path_chain_starts_at_root() {
        let drive = MemoryDrive::new();
        let id = drive.mkdir_p("/a/b");
        let chain = drive.path_chain(&id).await.unwrap();
        let names: Vec<_> = chain.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![ROOT_NAME, "a", "b"]);
        assert_eq!(chain[0].id, ROOT_ID);
    }

    #[tokio::test]
    async fn move_with_rename_replaces_existing_file() {
        let drive = MemoryDrive::new();
        let src = drive.put_file("/a.txt", "new");
        drive.put_file("/docs/b.txt", "old");
        let docs = drive.mkdir_p("/docs");

        drive.move_entry(&src, &docs, Some("b.txt")).await.unwrap();

        assert!(!drive.exists("/a.txt"));
        assert_eq!(drive.contents("/docs/b.txt").unwrap(), Bytes::from("new"));
    }

    #[tokio::test]
    async fn copy_duplicates_subtree() {
        let drive = MemoryDrive::new();
        let src = drive.mkdir_p("/src");
        drive.put_file("/src/inner/x.bin", vec![1u8, 2, 3]);
        let dst = drive.mkdir_p("/dst");

        drive.copy_entry(&src, &dst, None).await.unwrap();

        assert!(drive.exists("/src/inner/x.bin"));
        assert_eq!(drive.contents("/dst/src/inner/x.bin").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn folder_cannot_move_into_itself() {
        let drive = MemoryDrive::new();
        let a = drive.mkdir_p("/a");
        let b = drive.mkdir_p("/a/b");
        let err = drive.move_entry(&a, &b, None).await.unwrap_err();
        assert!(matches!(err, DriveError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn trash_removes_subtree() {
        let drive = MemoryDrive::new();
        let id = drive.mkdir_p("/old");
        drive.put_file("/old/a.txt", "x");

        drive.trash(&id).await.unwrap();

        assert!(!drive.exists("/old"));
        assert!(!drive.exists("/old/a.txt"));
        assert_eq!(drive.trashed(), vec!["old".to_string()]);
    }

    #[tokio::test]
    async fn create_folder_collision_modes() {
        let drive = MemoryDrive::new();
        let first = drive.create_folder(ROOT_ID, "x", None).await.unwrap();
        let reused = drive
            .create_folder(ROOT_ID, "x", Some(CheckNameMode::Refuse))
            .await
            .unwrap();
        assert_eq!(first.id, reused.id);

        let renamed = drive
            .create_folder(ROOT_ID, "x", Some(CheckNameMode::AutoRename))
            .await
            .unwrap();
        assert_eq!(renamed.name, "x(1)");
    }

    #[tokio::test]
    async fn upload_refuse_rejects_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let local = tmp.path().join("a.txt");
        std::fs::write(&local, "local").unwrap();

        let drive = MemoryDrive::new();
        drive.put_file("/a.txt", "remote");

        let err = drive
            .upload_file(&local, ROOT_ID, None, Some(CheckNameMode::Refuse))
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::AlreadyExists(_)));

        drive
            .upload_file(&local, ROOT_ID, None, Some(CheckNameMode::Overwrite))
            .await
            .unwrap();
        assert_eq!(drive.contents("/a.txt").unwrap(), Bytes::from("local"));

        let renamed = drive
            .upload_file(&local, ROOT_ID, None, Some(CheckNameMode::AutoRename))
            .await
            .unwrap();
        assert_eq!(renamed.name, "a(1).txt");
    }

    #[tokio::test]
    async fn folder_round_trip_through_local_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("photos");
        std::fs::create_dir_all(src.join("2022")).unwrap();
        std::fs::write(src.join("2022/cat.jpg"), "meow").unwrap();
        std::fs::write(src.join("index.txt"), "list").unwrap();

        let drive = MemoryDrive::new();
        let folder = drive.upload_folder(&src, ROOT_ID, None, None).await.unwrap();
        assert_eq!(drive.contents("/photos/2022/cat.jpg").unwrap(), Bytes::from("meow"));

        let out = tmp.path().join("out");
        let written = drive.download_folder(&folder.id, &out).await.unwrap();
        assert_eq!(written, out.join("photos"));
        assert_eq!(std::fs::read_to_string(out.join("photos/2022/cat.jpg")).unwrap(), "meow");
        assert_eq!(std::fs::read_to_string(out.join("photos/index.txt")).unwrap(), "list");
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let drive = MemoryDrive::new();
        drive.fail_next("list_children", DriveError::transient("busy"));

        assert!(drive.list_children(ROOT_ID).await.is_err());
        assert!(drive.list_children(ROOT_ID).await.is_ok());
        assert_eq!(drive.calls().len(), 2);
    }
}
