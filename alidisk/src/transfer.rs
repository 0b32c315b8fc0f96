//! Upload and download orchestration.
//!
//! A source ending in `*` is a name prefix: uploads expand it against the
//! local directory, downloads against a single listing of the remote folder.

use std::path::{Path, PathBuf};

use alidisk_sdk::{CheckNameMode, DriveResult, Entry, EntryKind};

use crate::error::{ShellError, ShellResult};
use crate::path;
use crate::resolver::Resolved;
use crate::shell::Shell;

/// Positional transfer arguments split into sources, target and mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferArgs {
    pub sources: Vec<String>,
    pub target: Option<String>,
    pub mode: Option<CheckNameMode>,
}

/// Every local entry whose name starts with the prefix before the trailing
/// `*`, sorted.
pub async fn expand_local_wildcard(pattern: &str) -> std::io::Result<Vec<PathBuf>> {
    let prefix = pattern.trim_end_matches('*');
    let (dir, name_prefix) = if prefix.is_empty() || prefix.ends_with('/') {
        (PathBuf::from(if prefix.is_empty() { "." } else { prefix }), String::new())
    } else {
        let path = Path::new(prefix);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (dir, name)
    };

    let mut matches = Vec::new();
    let mut entries = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with(&name_prefix) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

/// The first of `names` that exists as a directory under `home`, else `.`.
pub fn default_download_dir(home: Option<&Path>, names: &[String]) -> PathBuf {
    home.and_then(|home| {
        names
            .iter()
            .map(|name| home.join(name))
            .find(|candidate| candidate.is_dir())
    })
    .unwrap_or_else(|| PathBuf::from("."))
}

/// Where a transfer lands on the drive.
struct Destination {
    parent_id: String,
    parent_path: String,
    name: Option<String>,
}

impl Shell {
    fn local_exists(&self, arg: &str) -> bool {
        Path::new(&self.expand_home(arg)).exists()
    }

    /// `upload SOURCE... [TARGET] [MODE]`: a trailing collision mode is
    /// taken first, then the last argument is the target unless it exists
    /// locally.
    pub fn split_upload_args(&self, args: &[String]) -> TransferArgs {
        let mut args = args.to_vec();
        let mut mode = None;
        if args.len() > 1 {
            if let Some(last) = args.last() {
                if !self.local_exists(last) {
                    mode = last.parse::<CheckNameMode>().ok();
                }
            }
            if mode.is_some() {
                args.pop();
            }
        }
        let target = match args.last() {
            Some(last) if args.len() > 1 && !self.local_exists(last) => args.pop(),
            _ => None,
        };
        TransferArgs {
            sources: args,
            target,
            mode,
        }
    }

    /// `download SOURCE... [LOCAL_DIR]`: the last argument is the local
    /// target only when it already exists.
    pub fn split_download_args(&self, args: &[String]) -> TransferArgs {
        let mut args = args.to_vec();
        let target = match args.last() {
            Some(last) if args.len() > 1 && self.local_exists(last) => args.pop(),
            _ => None,
        };
        TransferArgs {
            sources: args,
            target,
            mode: None,
        }
    }

    /// Uploads each source into `target` (default: the working directory).
    /// Returns whether every upload succeeded.
    pub async fn upload(
        &mut self,
        sources: &[String],
        target: Option<&str>,
        mode: Option<CheckNameMode>,
    ) -> ShellResult<bool> {
        if sources.is_empty() {
            return Err(ShellError::MissingArgument("source"));
        }
        let target = path::join(&self.pwd, target.unwrap_or_default());

        let mut all_ok = true;
        for source in sources {
            let source = self.expand_home(source);
            let ok = if source.ends_with('*') {
                let locals = expand_local_wildcard(&source).await?;
                if locals.is_empty() {
                    self.print(&format!("no local path matches {source}"))?;
                    false
                } else {
                    self.upload_batch(&locals, &target, mode).await?
                }
            } else {
                self.upload_one(Path::new(&source), &target, mode).await?
            };
            all_ok &= ok;
        }
        Ok(all_ok)
    }

    /// Folders go up one at a time, files in one grouped call.
    async fn upload_batch(
        &mut self,
        locals: &[PathBuf],
        target: &str,
        mode: Option<CheckNameMode>,
    ) -> ShellResult<bool> {
        let (dirs, files): (Vec<PathBuf>, Vec<PathBuf>) =
            locals.iter().cloned().partition(|p| p.is_dir());

        let mut all_ok = true;
        for dir in &dirs {
            all_ok &= self.upload_one(dir, target, mode).await?;
        }
        if files.is_empty() {
            return Ok(all_ok);
        }

        let Some(dest) = self.upload_destination(target).await else {
            self.print("target path not exist, nothing uploaded.")?;
            return Ok(false);
        };
        match self.client.upload_files(&files, &dest.parent_id, mode).await {
            Ok(entries) => {
                tracing::info!(count = entries.len(), target = %dest.parent_path, "uploaded files");
                for entry in &entries {
                    self.remember(&dest.parent_path, &entry.name);
                }
                Ok(all_ok)
            }
            Err(e) => {
                tracing::warn!(target = %dest.parent_path, error = %e, "grouped upload failed");
                self.print("upload failed")?;
                Ok(false)
            }
        }
    }

    async fn upload_one(
        &mut self,
        local: &Path,
        target: &str,
        mode: Option<CheckNameMode>,
    ) -> ShellResult<bool> {
        let Ok(meta) = tokio::fs::metadata(local).await else {
            self.print(&format!("local path not exist: {}", local.display()))?;
            return Ok(false);
        };
        let Some(dest) = self.upload_destination(target).await else {
            self.print("target path not exist, nothing uploaded.")?;
            return Ok(false);
        };

        let result = if meta.is_dir() {
            // Files inside an uploaded folder always replace their namesakes.
            self.client
                .upload_folder(local, &dest.parent_id, Some(CheckNameMode::Overwrite), mode)
                .await
        } else {
            self.client
                .upload_file(local, &dest.parent_id, dest.name.as_deref(), mode)
                .await
        };

        match result {
            Ok(entry) => {
                tracing::info!(local = %local.display(), name = %entry.name, "uploaded");
                self.remember(&dest.parent_path, &entry.name);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(local = %local.display(), error = %e, "upload failed");
                self.print("upload failed")?;
                Ok(false)
            }
        }
    }

    /// An existing folder receives the upload under its own name; anything
    /// else names the entry to create inside its parent folder.
    async fn upload_destination(&self, target: &str) -> Option<Destination> {
        if let Resolved::Folder(id) = self.resolver.resolve(target).await {
            return Some(Destination {
                parent_id: id,
                parent_path: target.to_string(),
                name: None,
            });
        }
        let parent = path::dirname(target);
        let parent_id = self.resolver.folder_id(&parent).await?;
        Some(Destination {
            parent_id,
            parent_path: parent,
            name: Some(path::basename(target)),
        })
    }

    /// Downloads each source into `target`, or the default download folder.
    /// Plain sources go first, in order; wildcard sources are then fetched
    /// folder by folder, so every remote folder is listed once however many
    /// prefixes name it. Returns whether every download succeeded.
    pub async fn download(&mut self, sources: &[String], target: Option<&str>) -> ShellResult<bool> {
        if sources.is_empty() {
            return Err(ShellError::MissingArgument("source"));
        }
        let local_dir = match target {
            Some(target) => PathBuf::from(self.expand_home(target)),
            None => default_download_dir(self.home.as_deref(), &self.download_dirs),
        };

        let mut wildcards: Vec<(String, Vec<String>)> = Vec::new();
        let mut all_ok = true;
        for source in sources {
            match source.strip_suffix('*') {
                Some(prefix) => {
                    let (folder, name_prefix) =
                        path::split_prefix(&self.pwd, prefix.trim_end_matches('*'));
                    match wildcards.iter_mut().find(|(f, _)| *f == folder) {
                        Some((_, prefixes)) if prefixes.contains(&name_prefix) => {}
                        Some((_, prefixes)) => prefixes.push(name_prefix),
                        None => wildcards.push((folder, vec![name_prefix])),
                    }
                }
                None => all_ok &= self.download_one(source, &local_dir).await?,
            }
        }
        for (folder, prefixes) in &wildcards {
            all_ok &= self.download_batch(folder, prefixes, &local_dir).await?;
        }
        Ok(all_ok)
    }

    async fn download_one(&mut self, source: &str, local_dir: &Path) -> ShellResult<bool> {
        let full = path::join(&self.pwd, source);
        let result = match self.resolver.resolve(&full).await {
            Resolved::File(id) => self.client.download_file(&id, local_dir).await,
            Resolved::Folder(id) => self.client.download_folder(&id, local_dir).await,
            Resolved::Missing => {
                self.print("source path not exist, nothing downloaded.")?;
                return Ok(false);
            }
        };
        self.report_download(&full, result)
    }

    /// Lists `folder` once, then fetches every entry matching one of
    /// `prefixes` with a pause between items.
    async fn download_batch(
        &mut self,
        folder: &str,
        prefixes: &[String],
        local_dir: &Path,
    ) -> ShellResult<bool> {
        let Some(folder_id) = self.resolver.folder_id(folder).await else {
            self.print("source path not exist, nothing downloaded.")?;
            return Ok(false);
        };

        let entries = self
            .pacing
            .paced_listing(self.client.as_ref(), &folder_id)
            .await?;
        let mut all_ok = true;
        for prefix in prefixes {
            if !entries.iter().any(|e| e.name.starts_with(prefix.as_str())) {
                self.print(&format!("nothing in {folder} matches {prefix}*"))?;
                all_ok = false;
            }
        }
        let matches: Vec<Entry> = entries
            .into_iter()
            .filter(|e| prefixes.iter().any(|p| e.name.starts_with(p.as_str())))
            .collect();

        for (i, entry) in matches.iter().enumerate() {
            if i > 0 {
                self.pacing.between_items().await;
            }
            let result = match entry.kind {
                EntryKind::File => self.client.download_file(&entry.id, local_dir).await,
                EntryKind::Folder => self.client.download_folder(&entry.id, local_dir).await,
            };
            all_ok &= self.report_download(&path::join(folder, &entry.name), result)?;
        }
        Ok(all_ok)
    }

    fn report_download(&mut self, remote: &str, result: DriveResult<PathBuf>) -> ShellResult<bool> {
        match result {
            Ok(local) => {
                tracing::info!(remote, local = %local.display(), "downloaded");
                self.print(&local.display().to_string())?;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(remote, error = %e, "download failed");
                self.print(&format!("download failed: {e}"))?;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wildcard_selects_prefix_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["x", "xa", "y"] {
            std::fs::write(tmp.path().join(name), name).unwrap();
        }
        let pattern = format!("{}/x*", tmp.path().display());
        let matches = expand_local_wildcard(&pattern).await.unwrap();
        assert_eq!(matches, vec![tmp.path().join("x"), tmp.path().join("xa")]);

        let all = expand_local_wildcard(&format!("{}/*", tmp.path().display()))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn download_dir_falls_back_to_current() {
        let home = tempfile::tempdir().unwrap();
        let names: Vec<String> = ["download", "downloads", "Downloads", "Download"]
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(default_download_dir(Some(home.path()), &names), PathBuf::from("."));
        assert_eq!(default_download_dir(None, &names), PathBuf::from("."));

        std::fs::create_dir(home.path().join("Downloads")).unwrap();
        std::fs::create_dir(home.path().join("Download")).unwrap();
        assert_eq!(
            default_download_dir(Some(home.path()), &names),
            home.path().join("Downloads")
        );
    }
}
