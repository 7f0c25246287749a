//! Daily news time budget.
//!
//! Running total of time spent on news sites for the current calendar day.
//! Crossing the budget blocks all news sites collectively for a fixed
//! window. The daily total is independent of the block: un-blocking keeps
//! the total, only day rollover resets it.

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::StorageError;
use crate::events::Event;
use crate::storage::{config::NewsConfig, get_json, keys, set_json, KvStore};

/// Persisted accumulator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsTimeData {
    /// Start of the accumulation day (epoch milliseconds).
    pub daily_start_ms: u64,
    /// Time spent on news sites since `daily_start_ms`.
    pub total_ms: u64,
    pub blocked: bool,
    /// Only meaningful while `blocked` is true.
    pub blocked_until_ms: u64,
}

impl NewsTimeData {
    fn fresh(now_ms: u64) -> Self {
        Self {
            daily_start_ms: now_ms,
            total_ms: 0,
            blocked: false,
            blocked_until_ms: 0,
        }
    }
}

/// Accumulator over the shared `news_time_data` entry.
///
/// Concurrent tabs each run their own instance against the same entry;
/// the last write wins, same as the rest of the storage layer.
pub struct NewsTimeTracker<'a> {
    store: &'a dyn KvStore,
    config: NewsConfig,
}

impl<'a> NewsTimeTracker<'a> {
    pub fn new(store: &'a dyn KvStore, config: NewsConfig) -> Self {
        Self { store, config }
    }

    /// Current state with day rollover applied (persisted if it changed).
    pub fn data(&self, now_ms: u64) -> NewsTimeData {
        let mut data = self.load(now_ms);
        if self.rollover(&mut data, now_ms) {
            self.save(&data);
        }
        data
    }

    /// Add tracked news time. Returns true exactly on the call that
    /// crosses the daily budget; that call also sets the block window.
    /// Already-blocked or still-below-budget calls persist and return
    /// false.
    ///
    /// # Errors
    /// Returns an error if the updated state cannot be persisted.
    pub fn add_news_time(&self, delta_ms: u64, now_ms: u64) -> Result<bool, StorageError> {
        let mut data = self.load(now_ms);
        self.rollover(&mut data, now_ms);
        data.total_ms = data.total_ms.saturating_add(delta_ms);

        let crossed = !data.blocked && data.total_ms >= self.limit_ms();
        if crossed {
            data.blocked = true;
            data.blocked_until_ms = now_ms + self.block_duration_ms();
        }
        set_json(self.store, keys::NEWS_TIME_DATA, &data)?;
        Ok(crossed)
    }

    /// Start the collective news block immediately (user chose "block" on
    /// a news site), regardless of the daily total.
    ///
    /// # Errors
    /// Returns an error if the updated state cannot be persisted.
    pub fn force_block(&self, now_ms: u64) -> Result<Event, StorageError> {
        let mut data = self.load(now_ms);
        self.rollover(&mut data, now_ms);
        data.blocked = true;
        data.blocked_until_ms = now_ms + self.block_duration_ms();
        set_json(self.store, keys::NEWS_TIME_DATA, &data)?;
        Ok(Event::NewsTimeBlockCreated {
            blocked_until_ms: data.blocked_until_ms,
            at: clock::datetime(now_ms),
        })
    }

    /// Is the collective news block active? A block found expired here is
    /// cleared as a side effect; the returned event reports the clearing.
    pub fn check_blocked(&self, now_ms: u64) -> (bool, Option<Event>) {
        let mut data = self.load(now_ms);
        let rolled = self.rollover(&mut data, now_ms);

        if data.blocked && now_ms >= data.blocked_until_ms {
            data.blocked = false;
            data.blocked_until_ms = 0;
            self.save(&data);
            return (
                false,
                Some(Event::NewsTimeBlockRemoved {
                    at: clock::datetime(now_ms),
                }),
            );
        }
        if rolled {
            self.save(&data);
        }
        (data.blocked, None)
    }

    pub fn is_news_time_blocked(&self, now_ms: u64) -> bool {
        self.check_blocked(now_ms).0
    }

    /// Time until the news block lifts; 0 when not blocked.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        let data = self.data(now_ms);
        if data.blocked {
            data.blocked_until_ms.saturating_sub(now_ms)
        } else {
            0
        }
    }

    fn limit_ms(&self) -> u64 {
        self.config.daily_limit_min * 60 * 1000
    }

    fn block_duration_ms(&self) -> u64 {
        self.config.block_duration_min * 60 * 1000
    }

    /// Reset total/daily_start when the stored day is not today. Leaves
    /// the block fields alone; an overnight block expires on its own
    /// clock. Returns whether anything changed.
    fn rollover(&self, data: &mut NewsTimeData, now_ms: u64) -> bool {
        if clock::same_day(data.daily_start_ms, now_ms) {
            return false;
        }
        data.daily_start_ms = now_ms;
        data.total_ms = 0;
        true
    }

    fn load(&self, now_ms: u64) -> NewsTimeData {
        match get_json(self.store, keys::NEWS_TIME_DATA) {
            Ok(Some(data)) => data,
            Ok(None) => NewsTimeData::fresh(now_ms),
            Err(e) => {
                log::warn!("news time data unreadable, starting fresh: {e}");
                NewsTimeData::fresh(now_ms)
            }
        }
    }

    fn save(&self, data: &NewsTimeData) {
        if let Err(e) = set_json(self.store, keys::NEWS_TIME_DATA, data) {
            log::warn!("failed to persist news time data: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const T0: u64 = 1_705_320_000_000; // 2024-01-15T12:00:00Z
    const MIN: u64 = 60_000;
    const DAY: u64 = 24 * 60 * MIN;

    fn tracker(store: &MemoryStore) -> NewsTimeTracker<'_> {
        NewsTimeTracker::new(store, NewsConfig::default())
    }

    #[test]
    fn crossing_call_returns_true_exactly_once() {
        let store = MemoryStore::new();
        let news = tracker(&store);

        assert!(!news.add_news_time(19 * MIN, T0).unwrap());
        // 19min + 2min crosses the 20-minute budget.
        assert!(news.add_news_time(2 * MIN, T0 + MIN).unwrap());

        let data = news.data(T0 + MIN);
        assert!(data.blocked);
        assert_eq!(data.blocked_until_ms, T0 + MIN + 60 * MIN);

        // Further additions while blocked do not re-trigger.
        assert!(!news.add_news_time(5 * MIN, T0 + 2 * MIN).unwrap());
    }

    #[test]
    fn block_expires_lazily_and_keeps_daily_total() {
        let store = MemoryStore::new();
        let news = tracker(&store);
        news.add_news_time(25 * MIN, T0).unwrap();
        assert!(news.is_news_time_blocked(T0 + MIN));

        let lift = T0 + 61 * MIN;
        let (blocked, event) = news.check_blocked(lift);
        assert!(!blocked);
        assert!(matches!(event, Some(Event::NewsTimeBlockRemoved { .. })));

        // Daily total survives the un-block; only rollover resets it.
        let data = news.data(lift);
        assert_eq!(data.total_ms, 25 * MIN);
        assert!(!data.blocked);

        // Second check: no further event.
        let (blocked, event) = news.check_blocked(lift + MIN);
        assert!(!blocked);
        assert!(event.is_none());
    }

    #[test]
    fn day_rollover_resets_total_only() {
        let store = MemoryStore::new();
        let news = tracker(&store);
        news.add_news_time(15 * MIN, T0).unwrap();

        let tomorrow = T0 + DAY;
        let data = news.data(tomorrow);
        assert_eq!(data.total_ms, 0);
        assert_eq!(data.daily_start_ms, tomorrow);

        // Reset is idempotent within the same day.
        let again = news.data(tomorrow + MIN);
        assert_eq!(again.total_ms, 0);
        assert_eq!(again.daily_start_ms, tomorrow);
    }

    #[test]
    fn fresh_day_budget_accumulates_from_zero() {
        let store = MemoryStore::new();
        let news = tracker(&store);
        news.add_news_time(19 * MIN, T0).unwrap();
        // Next day: the 19 minutes are gone, a small delta does not trip.
        assert!(!news.add_news_time(5 * MIN, T0 + DAY).unwrap());
        assert_eq!(news.data(T0 + DAY).total_ms, 5 * MIN);
    }

    #[test]
    fn remaining_ms_reports_block_window() {
        let store = MemoryStore::new();
        let news = tracker(&store);
        assert_eq!(news.remaining_ms(T0), 0);

        news.add_news_time(20 * MIN, T0).unwrap();
        assert_eq!(news.remaining_ms(T0 + 10 * MIN), 50 * MIN);
    }

    #[test]
    fn force_block_starts_window_without_budget() {
        let store = MemoryStore::new();
        let news = tracker(&store);
        let event = news.force_block(T0).unwrap();
        assert!(matches!(event, Event::NewsTimeBlockCreated { .. }));
        assert!(news.is_news_time_blocked(T0 + MIN));
        assert!(!news.is_news_time_blocked(T0 + 61 * MIN));
    }

    #[test]
    fn monotonic_within_day() {
        let store = MemoryStore::new();
        let news = tracker(&store);
        let mut last = 0;
        for i in 0..10 {
            news.add_news_time(MIN, T0 + i * MIN).unwrap();
            let total = news.data(T0 + i * MIN).total_ms;
            assert!(total > last);
            last = total;
        }
    }
}
