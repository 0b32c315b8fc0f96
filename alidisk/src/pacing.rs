//! Request pacing for the drive provider.
//!
//! The provider rate-limits bursts of listings and downloads. Listings used
//! for wildcard expansion wait `listing_delay` first, batch transfers wait
//! `item_delay` between items, and transient listing failures are retried up
//! to `retries` times.

use std::time::Duration;

use alidisk_config::{ConfigError, PacingConfig};
use alidisk_sdk::{DriveResult, Entry, RemoteClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub listing_delay: Duration,
    pub item_delay: Duration,
    pub retries: u32,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            listing_delay: Duration::from_secs(5),
            item_delay: Duration::from_secs(1),
            retries: 2,
        }
    }
}

impl Pacing {
    /// No delays and no retries.
    pub fn none() -> Self {
        Self {
            listing_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
            retries: 0,
        }
    }

    pub fn from_config(config: &PacingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            listing_delay: config.listing_delay()?,
            item_delay: config.item_delay()?,
            retries: config.retries,
        })
    }

    pub async fn before_listing(&self) {
        pause(self.listing_delay, "before listing").await;
    }

    pub async fn between_items(&self) {
        pause(self.item_delay, "between items").await;
    }

    /// Lists `parent_id`, retrying transient failures.
    pub async fn list_children(
        &self,
        client: &dyn RemoteClient,
        parent_id: &str,
    ) -> DriveResult<Vec<Entry>> {
        let mut attempt = 0;
        loop {
            match client.list_children(parent_id).await {
                Ok(entries) => return Ok(entries),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(parent_id, attempt, error = %e, "listing failed, retrying");
                    pause(self.listing_delay, "before retry").await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Waits `listing_delay`, then lists with retries.
    pub async fn paced_listing(
        &self,
        client: &dyn RemoteClient,
        parent_id: &str,
    ) -> DriveResult<Vec<Entry>> {
        self.before_listing().await;
        self.list_children(client, parent_id).await
    }
}

async fn pause(delay: Duration, reason: &'static str) {
    if delay.is_zero() {
        return;
    }
    tracing::debug!(delay_ms = delay.as_millis() as u64, reason, "pacing");
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alidisk_sdk::{DriveError, MemoryDrive, ROOT_ID};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn paced_listing_waits_then_retries_transient_failures() {
        let drive = MemoryDrive::new();
        drive.put_file("/a.txt", "a");
        drive.fail_next("list_children", DriveError::transient("throttled"));
        drive.fail_next("list_children", DriveError::Timeout);

        let start = Instant::now();
        let entries = Pacing::default().paced_listing(&drive, ROOT_ID).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert_eq!(drive.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let drive = MemoryDrive::new();
        for _ in 0..3 {
            drive.fail_next("list_children", DriveError::transient("throttled"));
        }
        let pacing = Pacing {
            retries: 1,
            ..Pacing::default()
        };
        let err = pacing.list_children(&drive, ROOT_ID).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(drive.calls().len(), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let drive = MemoryDrive::new();
        drive.fail_next("list_children", DriveError::PermissionDenied("no".into()));
        let err = Pacing::default().list_children(&drive, ROOT_ID).await.unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(drive.calls().len(), 1);
    }

    #[test]
    fn from_config_parses_durations() {
        let pacing = Pacing::from_config(&PacingConfig {
            listing_delay: "3s".into(),
            item_delay: "250ms".into(),
            retries: 4,
        })
        .unwrap();
        assert_eq!(pacing.listing_delay, Duration::from_secs(3));
        assert_eq!(pacing.item_delay, Duration::from_millis(250));
        assert_eq!(pacing.retries, 4);
    }
}
