//! Core types and the [`RemoteClient`] capability shared by every alidisk
//! backend.
//!
//! A backend exposes an id-addressed tree of files and folders rooted at
//! [`ROOT_ID`]. The shell never talks to a backend directly; it holds a
//! `RemoteClient` and resolves virtual paths on top of it.

mod error;
mod memory;
mod remote;
mod types;

pub use error::{DriveError, DriveResult};
pub use memory::MemoryDrive;
pub use remote::RemoteClient;
pub use types::{Account, CheckNameMode, Entry, EntryKind, ROOT_ID, ROOT_NAME};
