//! alidisk - a POSIX-flavoured shell over an Aliyun Drive account
//!
//! This crate provides:
//! - Path resolution of virtual `/`-rooted paths against the drive
//! - `ls`, `cd`, `pwd`, `mv`, `cp`, `rm`, `mkdir`, `upload` and `download`
//! - Wildcard expansion and paced batch transfers
//! - A bounded completion cache for the interactive line editor

pub mod cache;
pub mod commands;
pub mod confirm;
pub mod error;
pub mod help;
pub mod output;
pub mod pacing;
pub mod path;
pub mod resolver;
pub mod shell;
pub mod transfer;

pub use cache::NameCache;
pub use commands::{tokenize, Command};
pub use confirm::{Confirm, FixedAnswer, TerminalConfirm};
pub use error::{ShellError, ShellResult};
pub use pacing::Pacing;
pub use resolver::{PathResolver, Resolved};
pub use shell::{Flow, Shell, ShellBuilder};
pub use transfer::{default_download_dir, expand_local_wildcard, TransferArgs};
