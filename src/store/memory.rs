//! DashMap-backed table with TTL and change feed

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::sync::broadcast;
use tracing::debug;

use super::{ChangeEvent, StoreError};

/// Buffered change events per table before slow subscribers start lagging
const FEED_CAPACITY: usize = 256;

struct Entry<T> {
    value: T,
    expires_at: Option<DateTime<Utc>>,
}

impl<T> Entry<T> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at <= now,
            None => false,
        }
    }
}

/// In-memory table keyed by string, with optional per-record TTL
///
/// Reads never return expired records. Physical removal happens in
/// [`sweep_expired`](MemoryTable::sweep_expired), which publishes a
/// `Remove` change event with the final record image.
pub struct MemoryTable<T> {
    name: &'static str,
    entries: DashMap<String, Entry<T>>,
    feed: broadcast::Sender<ChangeEvent<T>>,
}

impl<T> MemoryTable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            name,
            entries: DashMap::new(),
            feed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Subscribe to the change feed
    ///
    /// Only events published after the call are delivered; there is no
    /// replay. Subscribe before the first write that matters.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent<T>> {
        self.feed.subscribe()
    }

    /// Insert a record, failing if a live record already holds the key
    ///
    /// An expired record still awaiting sweep does not block the insert:
    /// it is removed (with a `Remove` event) and replaced.
    pub fn put_if_absent(
        &self,
        key: &str,
        value: T,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut evicted = None;

        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut slot) => {
                if !slot.get().is_expired(now) {
                    return Err(StoreError::AlreadyExists(key.to_string()));
                }
                let old = slot.insert(Entry { value: value.clone(), expires_at });
                evicted = Some(old.value);
            }
            MapEntry::Vacant(slot) => {
                slot.insert(Entry { value: value.clone(), expires_at });
            }
        }

        if let Some(before) = evicted {
            self.publish(ChangeEvent::Remove { before });
        }
        self.publish(ChangeEvent::Insert { after: value });
        Ok(())
    }

    /// Point lookup; expired records read as absent
    pub fn get(&self, key: &str) -> Result<T, StoreError> {
        let now = Utc::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.value.clone()),
            _ => Err(StoreError::NotFound(key.to_string())),
        }
    }

    /// Raw lookup that also returns expired records awaiting sweep
    pub fn peek(&self, key: &str) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Atomic conditional update (CAS) on a single record
    ///
    /// Runs `guard` against the current value while holding the record
    /// lock. Returns `Ok(true)` and applies `apply` when the guard
    /// passes, `Ok(false)` when it does not, and `Err(NotFound)` when
    /// the record is missing or expired.
    pub fn update_if(
        &self,
        key: &str,
        guard: impl FnOnce(&T) -> bool,
        apply: impl FnOnce(&mut T),
    ) -> Result<bool, StoreError> {
        let now = Utc::now();
        let event = {
            let mut entry = self
                .entries
                .get_mut(key)
                .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
            if entry.is_expired(now) {
                return Err(StoreError::NotFound(key.to_string()));
            }
            if !guard(&entry.value) {
                return Ok(false);
            }
            let before = entry.value.clone();
            apply(&mut entry.value);
            ChangeEvent::Modify {
                before,
                after: entry.value.clone(),
            }
        };

        self.publish(event);
        Ok(true)
    }

    /// Records whose key starts with `prefix`, ordered by key
    pub fn scan_prefix(&self, prefix: &str) -> Vec<T> {
        let now = Utc::now();
        let mut matches: Vec<(String, T)> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired(now))
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        matches.into_iter().map(|(_, v)| v).collect()
    }

    /// Physically remove expired records, publishing `Remove` for each
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            // Re-check under the record lock; a concurrent insert may
            // have replaced the expired entry already.
            if let Some((_, entry)) = self.entries.remove_if(&key, |_, e| e.is_expired(now)) {
                removed += 1;
                self.publish(ChangeEvent::Remove {
                    before: entry.value,
                });
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodic sweep loop; runs until the process exits
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration) -> ! {
        debug!(
            table = self.name,
            interval_ms = interval.as_millis() as u64,
            "Starting TTL sweeper"
        );
        loop {
            tokio::time::sleep(interval).await;
            let removed = self.sweep_expired(Utc::now());
            if removed > 0 {
                debug!(table = self.name, removed, "Swept expired records");
            }
        }
    }

    fn publish(&self, event: ChangeEvent<T>) {
        tracing::trace!(target: "RELAY", table = self.name, kind = event.kind(), "change event");
        // No subscribers is fine; the feed is observational.
        let _ = self.feed.send(event);
    }
}
