//! Entry names offered to tab completion.

use std::time::Duration;

use moka::sync::Cache;

/// A bounded set of names with a per-name time to live.
///
/// Clones share the same storage, so the shell and the line editor hold the
/// same cache. Names are cleared when the working directory changes and
/// refreshed by listings and mutating commands.
#[derive(Clone)]
pub struct NameCache {
    names: Cache<String, ()>,
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new(4096, Duration::from_secs(600))
    }
}

impl NameCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            names: Cache::builder()
                .max_capacity(capacity as u64)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn insert(&self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() {
            self.names.insert(name, ());
        }
    }

    pub fn extend<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.insert(name);
        }
    }

    pub fn remove(&self, name: &str) {
        self.names.invalidate(name);
    }

    pub fn clear(&self) {
        // Per key: names inserted right after a clear must stay visible.
        for (name, ()) in self.names.iter() {
            self.names.invalidate(name.as_str());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts over-capacity and expired names now instead of on the next
    /// maintenance pass.
    pub fn sync(&self) {
        self.names.run_pending_tasks();
    }

    /// Live names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.complete("")
    }

    /// Live names starting with `prefix`, sorted.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .names
            .iter()
            .filter(|(name, ())| name.starts_with(prefix))
            .map(|(name, ())| String::clone(&name))
            .collect();
        names.sort();
        names
    }
}
