//! Shell state shared by every command.

use std::path::PathBuf;
use std::sync::Arc;

use alidisk_config::AlidiskConfig;
use alidisk_sdk::{CheckNameMode, RemoteClient};

use crate::cache::NameCache;
use crate::confirm::{Confirm, TerminalConfirm};
use crate::error::{ShellError, ShellResult};
use crate::output::Output;
use crate::pacing::Pacing;
use crate::path;
use crate::resolver::{PathResolver, Resolved};

/// What the read loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    Logout,
}

pub struct Shell {
    pub(crate) client: Arc<dyn RemoteClient>,
    pub(crate) resolver: PathResolver,
    pub(crate) pwd: String,
    pub(crate) names: NameCache,
    pub(crate) pacing: Pacing,
    pub(crate) confirm: Arc<dyn Confirm>,
    pub(crate) download_dirs: Vec<String>,
    pub(crate) home: Option<PathBuf>,
    pub(crate) default_mode: Option<CheckNameMode>,
    pub(crate) out: Output,
}

impl Shell {
    pub fn builder(client: Arc<dyn RemoteClient>) -> ShellBuilder {
        ShellBuilder::new(client)
    }

    pub fn pwd(&self) -> &str {
        &self.pwd
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    /// Completion names; clones share storage with the line editor.
    pub fn names(&self) -> NameCache {
        self.names.clone()
    }

    pub fn default_mode(&self) -> Option<CheckNameMode> {
        self.default_mode
    }

    pub fn home(&self) -> Option<&std::path::Path> {
        self.home.as_deref()
    }

    /// Drains output captured by a buffered shell.
    pub fn take_output(&mut self) -> String {
        self.out.take()
    }

    /// Resolves `path` relative to the working directory.
    pub async fn resolve(&self, path: &str) -> Resolved {
        self.resolver.resolve(&path::join(&self.pwd, path)).await
    }

    /// Replaces the completion names with the working directory's children.
    pub async fn refresh_names(&mut self) -> ShellResult<()> {
        let Some(id) = self.resolver.folder_id(&self.pwd).await else {
            self.names.clear();
            return Ok(());
        };
        let entries = self.pacing.list_children(self.client.as_ref(), &id).await?;
        self.names.clear();
        self.names.extend(entries.into_iter().map(|e| e.name));
        Ok(())
    }

    /// Records `name` for completion when it lives in the working directory.
    pub(crate) fn remember(&self, parent: &str, name: &str) {
        if path::normalize(parent) == self.pwd {
            self.names.insert(name);
        }
    }

    pub(crate) fn forget(&self, parent: &str, name: &str) {
        if path::normalize(parent) == self.pwd {
            self.names.remove(name);
        }
    }

    pub(crate) fn print(&mut self, line: &str) -> ShellResult<()> {
        self.out.writeln(line).map_err(ShellError::Io)
    }

    /// Expands a leading `~` to the home directory.
    pub fn expand_home(&self, local: &str) -> String {
        let home = self.home.clone();
        shellexpand::tilde_with_context(local, || {
            home.map(|h| h.to_string_lossy().into_owned())
        })
        .into_owned()
    }
}

pub struct ShellBuilder {
    client: Arc<dyn RemoteClient>,
    pacing: Pacing,
    names: NameCache,
    confirm: Arc<dyn Confirm>,
    download_dirs: Vec<String>,
    home: Option<PathBuf>,
    default_mode: Option<CheckNameMode>,
    capture_output: bool,
}

impl ShellBuilder {
    fn new(client: Arc<dyn RemoteClient>) -> Self {
        let transfer = alidisk_config::TransferConfig::default();
        Self {
            client,
            pacing: Pacing::default(),
            names: NameCache::default(),
            confirm: Arc::new(TerminalConfirm),
            download_dirs: transfer.download_dirs,
            home: dirs::home_dir(),
            default_mode: Some(CheckNameMode::Refuse),
            capture_output: false,
        }
    }

    /// Applies the `shell` and `transfer` sections.
    pub fn config(mut self, config: &AlidiskConfig) -> ShellResult<Self> {
        self.pacing = Pacing::from_config(&config.transfer.pacing)?;
        self.names = NameCache::new(
            config.shell.completion.capacity,
            config.shell.completion.ttl()?,
        );
        self.download_dirs.clone_from(&config.transfer.download_dirs);
        self.default_mode = Some(
            config
                .transfer
                .default_mode
                .parse()
                .map_err(|_| ShellError::InvalidArgument(config.transfer.default_mode.clone()))?,
        );
        Ok(self)
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn names(mut self, names: NameCache) -> Self {
        self.names = names;
        self
    }

    pub fn confirm(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Arc::new(confirm);
        self
    }

    pub fn download_dirs(mut self, dirs: Vec<String>) -> Self {
        self.download_dirs = dirs;
        self
    }

    pub fn home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn default_mode(mut self, mode: Option<CheckNameMode>) -> Self {
        self.default_mode = mode;
        self
    }

    /// Buffers output instead of writing to stdout; see [`Shell::take_output`].
    pub fn capture_output(mut self) -> Self {
        self.capture_output = true;
        self
    }

    pub fn build(self) -> Shell {
        Shell {
            resolver: PathResolver::new(self.client.clone()),
            client: self.client,
            pwd: "/".to_string(),
            names: self.names,
            pacing: self.pacing,
            confirm: self.confirm,
            download_dirs: self.download_dirs,
            home: self.home,
            default_mode: self.default_mode,
            out: if self.capture_output {
                Output::Buffer(Vec::new())
            } else {
                Output::Stdout
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alidisk_sdk::MemoryDrive;

    #[test]
    fn shell_creation() {
        let shell = Shell::builder(Arc::new(MemoryDrive::new())).build();
        assert_eq!(shell.pwd(), "/");
        assert_eq!(shell.default_mode(), Some(CheckNameMode::Refuse));
        assert!(shell.names().is_empty());
    }

    #[test]
    fn config_sets_mode_and_pacing() {
        let mut config = AlidiskConfig::default();
        config.transfer.default_mode = "auto_rename".into();
        config.transfer.pacing.item_delay = "0s".into();
        let shell = Shell::builder(Arc::new(MemoryDrive::new()))
            .config(&config)
            .unwrap()
            .build();
        assert_eq!(shell.default_mode(), Some(CheckNameMode::AutoRename));
        assert!(shell.pacing.item_delay.is_zero());

        config.transfer.default_mode = "sometimes".into();
        assert!(matches!(
            Shell::builder(Arc::new(MemoryDrive::new())).config(&config),
            Err(ShellError::InvalidArgument(_))
        ));
    }

    #[test]
    fn expand_home_uses_configured_home() {
        let shell = Shell::builder(Arc::new(MemoryDrive::new()))
            .home(Some(PathBuf::from("/home/norvyn")))
            .build();
        assert_eq!(shell.expand_home("~/photos/a.jpg"), "/home/norvyn/photos/a.jpg");
        assert_eq!(shell.expand_home("/tmp/~x"), "/tmp/~x");
    }
}
