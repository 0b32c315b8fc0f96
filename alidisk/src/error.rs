//! Error types for the alidisk shell

use alidisk_config::ConfigError;
use alidisk_sdk::DriveError;
use thiserror::Error;

/// Result type alias for shell operations
pub type ShellResult<T> = Result<T, ShellError>;

#[derive(Error, Debug)]
pub enum ShellError {
    /// A command was issued without a required argument
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// Failure reported by the drive backend
    #[error(transparent)]
    Drive(#[from] DriveError),

    /// Local file system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
