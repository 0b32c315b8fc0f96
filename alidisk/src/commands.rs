//! Command parsing and the folder-level commands.

use alidisk_sdk::{CheckNameMode, Entry, ROOT_ID, ROOT_NAME};

use crate::confirm;
use crate::error::{ShellError, ShellResult};
use crate::help;
use crate::path;
use crate::resolver::{is_root, Resolved};
use crate::shell::{Flow, Shell};

/// Splits a command line on whitespace, keeping double-quoted runs together.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Ls(Option<String>),
    Pwd,
    Cd(String),
    Mv { source: String, target: String },
    Cp { source: String, target: String },
    Rm(String),
    Mkdir(String),
    Upload(Vec<String>),
    Download(Vec<String>),
    Help(Option<String>),
    Logout,
    Quit,
    Unsupported(String),
}

impl Command {
    pub fn parse(line: &str) -> ShellResult<Self> {
        let mut tokens = tokenize(line).into_iter();
        let Some(verb) = tokens.next() else {
            return Ok(Self::Empty);
        };
        let args: Vec<String> = tokens.collect();

        let command = match verb.as_str() {
            // Names may contain spaces without quoting.
            "ls" => Self::Ls(Some(args.join(" ")).filter(|path| !path.is_empty())),
            "pwd" => Self::Pwd,
            "cd" => Self::Cd(args.join(" ")),
            "mv" | "cp" => {
                let mut args = args.into_iter();
                let source = args.next().ok_or(ShellError::MissingArgument("source"))?;
                let target = args.next().ok_or(ShellError::MissingArgument("target"))?;
                if verb == "mv" {
                    Self::Mv { source, target }
                } else {
                    Self::Cp { source, target }
                }
            }
            "rm" => Self::Rm(non_empty(args.join(" "), "path")?),
            "mkdir" => Self::Mkdir(non_empty(args.join(" "), "path")?),
            "upload" => Self::Upload(args),
            "download" => Self::Download(args),
            "help" => Self::Help(args.into_iter().next()),
            "logout" => Self::Logout,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unsupported(verb),
        };
        Ok(command)
    }
}

fn non_empty(arg: String, what: &'static str) -> ShellResult<String> {
    if arg.is_empty() {
        Err(ShellError::MissingArgument(what))
    } else {
        Ok(arg)
    }
}

fn verb_of(line: &str) -> String {
    tokenize(line).into_iter().next().unwrap_or_default()
}

/// Displayed path for a folder's ancestor chain. The drive root is `/`.
fn compose_path(chain: &[Entry]) -> String {
    let segments: Vec<&str> = chain
        .iter()
        .enumerate()
        .filter(|(i, e)| !(e.id == ROOT_ID || (*i == 0 && e.name == ROOT_NAME)))
        .map(|(_, e)| e.name.as_str())
        .collect();
    format!("/{}", segments.join("/"))
}

impl Shell {
    /// Runs one input line. Failures are reported on the shell's output and
    /// never end the loop.
    pub async fn execute(&mut self, line: &str) -> Flow {
        let result = match Command::parse(line) {
            Ok(command) => self.run(command).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(flow) => flow,
            Err(ShellError::MissingArgument(what)) => {
                tracing::debug!(line, what, "ignoring incomplete command");
                Flow::Continue
            }
            Err(e) => {
                let verb = verb_of(line);
                tracing::warn!(verb = %verb, error = %e, "command failed");
                let _ = self.print(&format!("{verb} failed: {e}"));
                Flow::Continue
            }
        }
    }

    pub async fn run(&mut self, command: Command) -> ShellResult<Flow> {
        match command {
            Command::Empty => {}
            Command::Ls(path) => {
                self.ls(path.as_deref()).await?;
            }
            Command::Pwd => {
                let pwd = self.pwd.clone();
                self.print(&pwd)?;
            }
            Command::Cd(path) => {
                self.cd(&path).await?;
            }
            Command::Mv { source, target } => {
                self.mv(&source, &target).await?;
            }
            Command::Cp { source, target } => {
                self.cp(&source, &target).await?;
            }
            Command::Rm(path) => {
                self.rm(&path).await?;
            }
            Command::Mkdir(path) => {
                self.mkdir(&path).await?;
            }
            Command::Upload(args) => {
                let args = self.split_upload_args(&args);
                let mode = args.mode.or(self.default_mode);
                self.upload(&args.sources, args.target.as_deref(), mode).await?;
            }
            Command::Download(args) => {
                let args = self.split_download_args(&args);
                self.download(&args.sources, args.target.as_deref()).await?;
            }
            Command::Help(verb) => self.help(verb.as_deref())?,
            Command::Logout => {
                self.logout().await?;
                return Ok(Flow::Logout);
            }
            Command::Quit => return Ok(Flow::Quit),
            Command::Unsupported(verb) => {
                tracing::debug!(verb = %verb, "unsupported command");
                self.print("command not supported.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn help(&mut self, verb: Option<&str>) -> ShellResult<()> {
        let text = match verb {
            None => help::format_help_list(),
            Some(verb) => match help::get_help(verb) {
                Some(cmd) => help::format_help(cmd),
                None => format!("no help for '{verb}'\n"),
            },
        };
        self.out.write(text.as_bytes())?;
        Ok(())
    }

    /// Lists a folder as `type size name` rows.
    pub async fn ls(&mut self, path: Option<&str>) -> ShellResult<bool> {
        let full = path::join(&self.pwd, path.unwrap_or_default());
        let Some(id) = self.resolver.folder_id(&full).await else {
            self.print(&format!("{full}: no such folder"))?;
            return Ok(false);
        };

        let entries = self.pacing.list_children(self.client.as_ref(), &id).await?;
        self.print(&format!("total {}", entries.len()))?;
        for entry in &entries {
            let size = entry.size.unwrap_or(0);
            self.print(&format!(
                "{:<3}{:<8}{:<10}",
                entry.kind.symbol(),
                size,
                entry.name
            ))?;
        }
        self.names.extend(entries.into_iter().map(|e| e.name));
        Ok(true)
    }

    /// Changes the working directory and returns it. A path that is not a
    /// folder leaves it unchanged.
    pub async fn cd(&mut self, path: &str) -> ShellResult<String> {
        let full = if path.is_empty() {
            "/".to_string()
        } else {
            path::join(&self.pwd, path)
        };

        let new_pwd = if is_root(&full) {
            "/".to_string()
        } else {
            let Some(id) = self.resolver.folder_id(&full).await else {
                return Ok(self.pwd.clone());
            };
            compose_path(&self.client.path_chain(&id).await?)
        };

        if new_pwd != self.pwd {
            tracing::debug!(from = %self.pwd, to = %new_pwd, "changing folder");
        }
        self.pwd = new_pwd;
        if let Err(e) = self.refresh_names().await {
            tracing::warn!(error = %e, "could not list new folder for completion");
        }
        Ok(self.pwd.clone())
    }

    pub async fn mv(&mut self, source: &str, target: &str) -> ShellResult<bool> {
        self.relocate(source, target, false).await
    }

    pub async fn cp(&mut self, source: &str, target: &str) -> ShellResult<bool> {
        self.relocate(source, target, true).await
    }

    async fn relocate(&mut self, source: &str, target: &str, copy: bool) -> ShellResult<bool> {
        let source = path::join(&self.pwd, source);
        let target = path::join(&self.pwd, target);

        let (parent_path, parent_id, new_name) = match self.resolver.resolve(&target).await {
            Resolved::File(_) => {
                if !confirm::ask(&self.confirm, "Target name exist, overwrite or not:").await {
                    self.print("Receive overwrite=False, nothing moved.")?;
                    return Ok(false);
                }
                let parent = path::dirname(&target);
                let Some(parent_id) = self.resolver.folder_id(&parent).await else {
                    self.print("target path not exist, nothing moved.")?;
                    return Ok(false);
                };
                (parent, parent_id, Some(path::basename(&target)))
            }
            Resolved::Folder(id) => (target.clone(), id, None),
            Resolved::Missing => {
                self.print("target path not exist, nothing moved.")?;
                return Ok(false);
            }
        };

        let Some(source_id) = self.resolver.resolve(&source).await.id().map(str::to_string) else {
            self.print("source path not exist, nothing moved.")?;
            return Ok(false);
        };
        if source_id == ROOT_ID {
            self.print("cannot move the drive root, nothing moved.")?;
            return Ok(false);
        }

        if copy {
            self.client
                .copy_entry(&source_id, &parent_id, new_name.as_deref())
                .await?;
        } else {
            self.client
                .move_entry(&source_id, &parent_id, new_name.as_deref())
                .await?;
            self.forget(&path::dirname(&source), &path::basename(&source));
        }

        let landed = new_name.unwrap_or_else(|| path::basename(&source));
        self.remember(&parent_path, &landed);
        tracing::info!(%source, %target, copy, "relocated");
        Ok(true)
    }

    /// Moves entries to the recycle bin and returns how many went. A trailing
    /// `*` removes every entry of the folder whose name starts with the
    /// prefix. Paths that do not resolve are skipped, and a failed entry is
    /// reported without stopping the rest.
    pub async fn rm(&mut self, path: &str) -> ShellResult<usize> {
        let mut doomed: Vec<(String, String, String)> = Vec::new();

        if let Some(prefix) = path.strip_suffix('*') {
            let prefix = prefix.trim_end_matches('*');
            let (folder, name_prefix) = path::split_prefix(&self.pwd, prefix);
            let Some(folder_id) = self.resolver.folder_id(&folder).await else {
                return Ok(0);
            };
            let entries = self
                .pacing
                .paced_listing(self.client.as_ref(), &folder_id)
                .await?;
            doomed.extend(
                entries
                    .into_iter()
                    .filter(|e| e.name.starts_with(&name_prefix))
                    .map(|e| (folder.clone(), e.name, e.id)),
            );
        } else {
            let full = path::join(&self.pwd, path);
            match self.resolver.resolve(&full).await.id() {
                Some(id) => doomed.push((path::dirname(&full), path::basename(&full), id.to_string())),
                None => return Ok(0),
            }
        }

        let mut removed = 0;
        for (folder, name, id) in doomed {
            if id == ROOT_ID {
                self.print("refusing to remove the drive root.")?;
                continue;
            }
            match self.client.trash(&id).await {
                Ok(()) => {
                    tracing::info!(folder = %folder, name = %name, "moved to recycle bin");
                    self.forget(&folder, &name);
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(folder = %folder, name = %name, error = %e, "could not remove");
                    self.print(&format!("rm failed: {e}"))?;
                }
            }
        }
        Ok(removed)
    }

    /// Creates a folder, reusing an existing one of the same name.
    pub async fn mkdir(&mut self, path: &str) -> ShellResult<bool> {
        let full = path::join(&self.pwd, path);
        let name = path::basename(&full);
        if name.is_empty() {
            return Err(ShellError::InvalidArgument(format!("cannot create {full}")));
        }
        let parent = path::dirname(&full);
        let Some(parent_id) = self.resolver.folder_id(&parent).await else {
            self.print("parent folder not exist, nothing created.")?;
            return Ok(false);
        };

        let folder = self
            .client
            .create_folder(&parent_id, &name, Some(CheckNameMode::Overwrite))
            .await?;
        self.remember(&parent, &folder.name);
        Ok(true)
    }

    /// Ends the session with the drive.
    pub async fn logout(&mut self) -> ShellResult<()> {
        self.client.logout().await?;
        self.names.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_groups_quotes() {
        assert_eq!(tokenize("rm \"my file.txt\""), ["rm", "my file.txt"]);
        assert_eq!(tokenize("  mv a   b "), ["mv", "a", "b"]);
        assert_eq!(tokenize("cd \"\""), ["cd", ""]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn parse_verbs() {
        assert_eq!(Command::parse("").unwrap(), Command::Empty);
        assert_eq!(Command::parse("ls").unwrap(), Command::Ls(None));
        assert_eq!(Command::parse("ls my docs").unwrap(), Command::Ls(Some("my docs".into())));
        assert_eq!(Command::parse("cd my docs").unwrap(), Command::Cd("my docs".into()));
        assert_eq!(
            Command::parse("cp a \"b c\"").unwrap(),
            Command::Cp {
                source: "a".into(),
                target: "b c".into()
            }
        );
        assert_eq!(Command::parse("rm \"foo bar\"").unwrap(), Command::Rm("foo bar".into()));
        assert_eq!(Command::parse("q").unwrap(), Command::Quit);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
        assert_eq!(
            Command::parse("lsx").unwrap(),
            Command::Unsupported("lsx".into())
        );
    }

    #[test]
    fn incomplete_commands_are_reported() {
        assert!(matches!(
            Command::parse("mv onlyone"),
            Err(ShellError::MissingArgument("target"))
        ));
        assert!(matches!(
            Command::parse("rm"),
            Err(ShellError::MissingArgument("path"))
        ));
    }

    #[test]
    fn compose_path_drops_root() {
        let chain = vec![
            Entry::folder(ROOT_ID, ROOT_NAME),
            Entry::folder("1", "docs"),
            Entry::folder("2", "Default"),
        ];
        assert_eq!(compose_path(&chain), "/docs/Default");

        let chain = vec![Entry::folder("1", "Default"), Entry::folder("2", "a")];
        assert_eq!(compose_path(&chain), "/a");
        assert_eq!(compose_path(&[]), "/");
    }
}
