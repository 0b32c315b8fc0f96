use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DriveError, DriveResult};
use crate::types::{Account, CheckNameMode, Entry, EntryKind};

/// The operations a cloud drive backend offers to the shell.
///
/// Every method is a single delegated call from the shell's point of view.
/// Bulk and folder transfers have default implementations built from the
/// per-file primitives.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn account(&self) -> DriveResult<Account>;

    async fn list_children(&self, parent_id: &str) -> DriveResult<Vec<Entry>>;

    /// Looks up an absolute path, returning `None` when nothing of `kind`
    /// lives there.
    async fn find_by_path(&self, path: &str, kind: EntryKind) -> DriveResult<Option<Entry>>;

    /// Ancestors of `id`, root-most first, ending with the entry itself.
    async fn path_chain(&self, id: &str) -> DriveResult<Vec<Entry>>;

    async fn move_entry(&self, id: &str, to_parent_id: &str, new_name: Option<&str>)
        -> DriveResult<()>;

    async fn copy_entry(&self, id: &str, to_parent_id: &str, new_name: Option<&str>)
        -> DriveResult<()>;

    /// Soft delete: the entry goes to the recycle bin.
    async fn trash(&self, id: &str) -> DriveResult<()>;

    async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry>;

    async fn upload_file(
        &self,
        local: &Path,
        parent_id: &str,
        name: Option<&str>,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry>;

    async fn upload_files(
        &self,
        locals: &[PathBuf],
        parent_id: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Vec<Entry>> {
        let mut uploaded = Vec::with_capacity(locals.len());
        for local in locals {
            uploaded.push(self.upload_file(local, parent_id, None, mode).await?);
        }
        Ok(uploaded)
    }

    /// Recreates `local` (a directory) under `parent_id`. `folder_mode`
    /// governs folder creation, `mode` the files inside.
    async fn upload_folder(
        &self,
        local: &Path,
        parent_id: &str,
        mode: Option<CheckNameMode>,
        folder_mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        upload_tree(self, local, parent_id, mode, folder_mode).await
    }

    /// Downloads a file into `local_dir`, returning the written path.
    async fn download_file(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf>;

    async fn download_folder(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf> {
        let chain = self.path_chain(id).await?;
        let folder = chain
            .last()
            .ok_or_else(|| DriveError::not_found(id.to_string()))?;
        download_tree(self, id, &folder.name, local_dir).await
    }

    async fn logout(&self) -> DriveResult<()>;
}

type TreeFuture<'a, T> = Pin<Box<dyn Future<Output = DriveResult<T>> + Send + 'a>>;

pub(crate) fn upload_tree<'a, C: RemoteClient + ?Sized>(
    client: &'a C,
    local: &'a Path,
    parent_id: &'a str,
    mode: Option<CheckNameMode>,
    folder_mode: Option<CheckNameMode>,
) -> TreeFuture<'a, Entry> {
    Box::pin(async move {
        let name = local_name(local)?;
        let folder = client.create_folder(parent_id, &name, folder_mode).await?;

        let mut children = Vec::new();
        let mut dir = tokio::fs::read_dir(local).await?;
        while let Some(child) = dir.next_entry().await? {
            children.push(child.path());
        }
        children.sort();

        for child in children {
            if child.is_dir() {
                upload_tree(client, &child, &folder.id, mode, folder_mode).await?;
            } else if child.is_file() {
                client.upload_file(&child, &folder.id, None, mode).await?;
            }
        }

        Ok(folder)
    })
}

pub(crate) fn download_tree<'a, C: RemoteClient + ?Sized>(
    client: &'a C,
    id: &'a str,
    name: &'a str,
    local_dir: &'a Path,
) -> TreeFuture<'a, PathBuf> {
    Box::pin(async move {
        let target = local_dir.join(name);
        tokio::fs::create_dir_all(&target).await?;

        for child in client.list_children(id).await? {
            if child.is_folder() {
                download_tree(client, &child.id, &child.name, &target).await?;
            } else {
                client.download_file(&child.id, &target).await?;
            }
        }

        Ok(target)
    })
}

fn local_name(local: &Path) -> DriveResult<String> {
    local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DriveError::invalid_argument(format!("{} has no file name", local.display())))
}

#[async_trait]
impl<C: RemoteClient + ?Sized> RemoteClient for Box<C> {
    async fn account(&self) -> DriveResult<Account> {
        (**self).account().await
    }

    async fn list_children(&self, parent_id: &str) -> DriveResult<Vec<Entry>> {
        (**self).list_children(parent_id).await
    }

    async fn find_by_path(&self, path: &str, kind: EntryKind) -> DriveResult<Option<Entry>> {
        (**self).find_by_path(path, kind).await
    }

    async fn path_chain(&self, id: &str) -> DriveResult<Vec<Entry>> {
        (**self).path_chain(id).await
    }

    async fn move_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        (**self).move_entry(id, to_parent_id, new_name).await
    }

    async fn copy_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        (**self).copy_entry(id, to_parent_id, new_name).await
    }

    async fn trash(&self, id: &str) -> DriveResult<()> {
        (**self).trash(id).await
    }

    async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        (**self).create_folder(parent_id, name, mode).await
    }

    async fn upload_file(
        &self,
        local: &Path,
        parent_id: &str,
        name: Option<&str>,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        (**self).upload_file(local, parent_id, name, mode).await
    }

    async fn upload_files(
        &self,
        locals: &[PathBuf],
        parent_id: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Vec<Entry>> {
        (**self).upload_files(locals, parent_id, mode).await
    }

    async fn upload_folder(
        &self,
        local: &Path,
        parent_id: &str,
        mode: Option<CheckNameMode>,
        folder_mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        (**self).upload_folder(local, parent_id, mode, folder_mode).await
    }

    async fn download_file(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf> {
        (**self).download_file(id, local_dir).await
    }

    async fn download_folder(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf> {
        (**self).download_folder(id, local_dir).await
    }

    async fn logout(&self) -> DriveResult<()> {
        (**self).logout().await
    }
}

#[async_trait]
impl<C: RemoteClient + ?Sized> RemoteClient for Arc<C> {
    async fn account(&self) -> DriveResult<Account> {
        (**self).account().await
    }

    async fn list_children(&self, parent_id: &str) -> DriveResult<Vec<Entry>> {
        (**self).list_children(parent_id).await
    }

    async fn find_by_path(&self, path: &str, kind: EntryKind) -> DriveResult<Option<Entry>> {
        (**self).find_by_path(path, kind).await
    }

    async fn path_chain(&self, id: &str) -> DriveResult<Vec<Entry>> {
        (**self).path_chain(id).await
    }

    async fn move_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        (**self).move_entry(id, to_parent_id, new_name).await
    }

    async fn copy_entry(
        &self,
        id: &str,
        to_parent_id: &str,
        new_name: Option<&str>,
    ) -> DriveResult<()> {
        (**self).copy_entry(id, to_parent_id, new_name).await
    }

    async fn trash(&self, id: &str) -> DriveResult<()> {
        (**self).trash(id).await
    }

    async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        (**self).create_folder(parent_id, name, mode).await
    }

    async fn upload_file(
        &self,
        local: &Path,
        parent_id: &str,
        name: Option<&str>,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        (**self).upload_file(local, parent_id, name, mode).await
    }

    async fn upload_files(
        &self,
        locals: &[PathBuf],
        parent_id: &str,
        mode: Option<CheckNameMode>,
    ) -> DriveResult<Vec<Entry>> {
        (**self).upload_files(locals, parent_id, mode).await
    }

    async fn upload_folder(
        &self,
        local: &Path,
        parent_id: &str,
        mode: Option<CheckNameMode>,
        folder_mode: Option<CheckNameMode>,
    ) -> DriveResult<Entry> {
        (**self).upload_folder(local, parent_id, mode, folder_mode).await
    }

    async fn download_file(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf> {
        (**self).download_file(id, local_dir).await
    }

    async fn download_folder(&self, id: &str, local_dir: &Path) -> DriveResult<PathBuf> {
        (**self).download_folder(id, local_dir).await
    }

    async fn logout(&self) -> DriveResult<()> {
        (**self).logout().await
    }
}
