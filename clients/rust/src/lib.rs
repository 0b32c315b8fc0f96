//! HTTP implementation of [`alidisk_sdk::RemoteClient`] for the Aliyun Drive
//! REST API.

mod client;
mod error;
mod session;
mod types;

pub use client::{DriveClient, DriveClientBuilder, DEFAULT_AUTH_ENDPOINT, DEFAULT_ENDPOINT};
pub use session::Session;
