//! Per-hostname time blocks.
//!
//! A time block records when a hostname was blocked and in which category;
//! the block is active until the category duration elapses. Expiry is
//! lazy: nothing is scheduled, an expired entry is deleted on the read that
//! discovers it (or by the periodic [`TimeBlockStore::cleanup_expired`]
//! sweep).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classifier::Category;
use crate::clock;
use crate::error::StorageError;
use crate::events::Event;
use crate::storage::{get_json, keys, set_json, KvStore};

/// A recorded block for one hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// When the block was created (epoch milliseconds).
    pub timestamp_ms: u64,
    pub category: Category,
}

impl TimeBlock {
    /// Active iff `now < timestamp + durationFor(category)`.
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.timestamp_ms.saturating_add(self.category.duration_ms())
    }

    /// `max(0, timestamp + duration - now)`.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.timestamp_ms
            .saturating_add(self.category.duration_ms())
            .saturating_sub(now_ms)
    }
}

/// Store of all active time blocks, keyed by hostname in a single
/// persisted map.
pub struct TimeBlockStore<'a> {
    store: &'a dyn KvStore,
}

impl<'a> TimeBlockStore<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    /// Is this hostname currently blocked? An expired entry found here is
    /// deleted as a side effect; a second read returns false with no
    /// further effect.
    pub fn is_time_blocked(&self, hostname: &str, now_ms: u64) -> bool {
        let mut map = self.load_map();
        match map.get(hostname) {
            Some(block) if block.is_active(now_ms) => true,
            Some(_) => {
                map.remove(hostname);
                self.save_map(&map);
                false
            }
            None => false,
        }
    }

    /// Current block for a hostname, if still active.
    pub fn get(&self, hostname: &str, now_ms: u64) -> Option<TimeBlock> {
        self.load_map()
            .get(hostname)
            .filter(|b| b.is_active(now_ms))
            .cloned()
    }

    /// Create (or overwrite) a block for a hostname.
    ///
    /// # Errors
    /// Returns an error if the updated map cannot be persisted.
    pub fn create_time_block(
        &self,
        hostname: &str,
        category: Category,
        now_ms: u64,
    ) -> Result<Event, StorageError> {
        let mut map = self.load_map();
        map.insert(
            hostname.to_string(),
            TimeBlock {
                timestamp_ms: now_ms,
                category,
            },
        );
        set_json(self.store, keys::TIME_BLOCKS, &map)?;
        Ok(Event::TimeBlockCreated {
            hostname: hostname.to_string(),
            category,
            duration_ms: category.duration_ms(),
            at: clock::datetime(now_ms),
        })
    }

    /// Delete a block. Returns the removal event when an entry existed.
    ///
    /// # Errors
    /// Returns an error if the updated map cannot be persisted.
    pub fn remove_time_block(
        &self,
        hostname: &str,
        now_ms: u64,
    ) -> Result<Option<Event>, StorageError> {
        let mut map = self.load_map();
        if map.remove(hostname).is_none() {
            return Ok(None);
        }
        set_json(self.store, keys::TIME_BLOCKS, &map)?;
        Ok(Some(Event::TimeBlockRemoved {
            hostname: hostname.to_string(),
            at: clock::datetime(now_ms),
        }))
    }

    /// `max(0, ts + duration - now)` for a hostname; 0 when not blocked.
    pub fn remaining_ms(&self, hostname: &str, now_ms: u64) -> u64 {
        self.get(hostname, now_ms)
            .map(|b| b.remaining_ms(now_ms))
            .unwrap_or(0)
    }

    /// Sweep all entries, deleting expired ones. One removal event per
    /// deletion. Called by the host's background scheduler.
    ///
    /// # Errors
    /// Returns an error if the updated map cannot be persisted.
    pub fn cleanup_expired(&self, now_ms: u64) -> Result<Vec<Event>, StorageError> {
        let mut map = self.load_map();
        let expired: Vec<String> = map
            .iter()
            .filter(|(_, block)| !block.is_active(now_ms))
            .map(|(host, _)| host.clone())
            .collect();

        if expired.is_empty() {
            return Ok(Vec::new());
        }

        for host in &expired {
            map.remove(host);
        }
        set_json(self.store, keys::TIME_BLOCKS, &map)?;

        Ok(expired
            .into_iter()
            .map(|hostname| Event::TimeBlockRemoved {
                hostname,
                at: clock::datetime(now_ms),
            })
            .collect())
    }

    /// All active blocks (for status display).
    pub fn active_blocks(&self, now_ms: u64) -> Vec<(String, TimeBlock)> {
        let mut blocks: Vec<(String, TimeBlock)> = self
            .load_map()
            .into_iter()
            .filter(|(_, b)| b.is_active(now_ms))
            .collect();
        blocks.sort_by(|a, b| a.0.cmp(&b.0));
        blocks
    }

    fn load_map(&self) -> HashMap<String, TimeBlock> {
        match get_json(self.store, keys::TIME_BLOCKS) {
            Ok(Some(map)) => map,
            Ok(None) => HashMap::new(),
            Err(e) => {
                log::warn!("time block map unreadable, treating as empty: {e}");
                HashMap::new()
            }
        }
    }

    fn save_map(&self, map: &HashMap<String, TimeBlock>) {
        if let Err(e) = set_json(self.store, keys::TIME_BLOCKS, map) {
            log::warn!("failed to persist time block map: {e}");
        }
    }
}
