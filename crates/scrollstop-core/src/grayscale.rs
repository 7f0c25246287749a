//! Grayscale penalty.
//!
//! Independent daily accumulator across all tracked sites. Once total
//! time crosses the threshold, the host applies a page-wide grayscale
//! filter for a fixed window. Entirely decoupled from time blocks: a user
//! can be penalized while not blocked, and vice versa.
//!
//! The host polls [`GrayscalePenalty::poll`] every 30 s while a tracked
//! page is active, and [`GrayscalePenalty::check_expired`] on its 60 s
//! background sweep.

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::events::Event;
use crate::storage::{config::GrayscaleConfig, get_json, keys, set_json, KvStore};

/// Persisted accumulator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrayscaleState {
    /// First visit to a tracked site today (epoch milliseconds).
    pub first_visit_ms: u64,
    /// End of the active filter window; 0 while never activated today.
    pub filter_end_ms: u64,
    /// Total tracked time today.
    pub total_ms: u64,
    /// `YYYY-MM-DD` of the last daily reset.
    pub last_reset_date: String,
}

impl GrayscaleState {
    fn fresh(now_ms: u64) -> Self {
        Self {
            first_visit_ms: now_ms,
            filter_end_ms: 0,
            total_ms: 0,
            last_reset_date: clock::date_str(now_ms),
        }
    }
}

/// Accumulate-then-penalize timer over the shared grayscale entry.
pub struct GrayscalePenalty<'a> {
    store: &'a dyn KvStore,
    config: GrayscaleConfig,
    last_poll_ms: Option<u64>,
}

impl<'a> GrayscalePenalty<'a> {
    pub fn new(store: &'a dyn KvStore, config: GrayscaleConfig) -> Self {
        Self {
            store,
            config,
            last_poll_ms: None,
        }
    }

    /// Is the filter currently applied?
    pub fn is_filter_active(&self, now_ms: u64) -> bool {
        now_ms < self.state(now_ms).filter_end_ms
    }

    /// Current state with the daily reset applied.
    pub fn state(&self, now_ms: u64) -> GrayscaleState {
        let mut state = self.load(now_ms);
        if state.last_reset_date != clock::date_str(now_ms) {
            state = GrayscaleState::fresh(now_ms);
            self.save(&state);
        }
        state
    }

    /// Accumulation poll. Adds the time since the previous poll to the
    /// daily total and activates the filter once the threshold is
    /// crossed. Returns the activation event on the crossing poll.
    pub fn poll(&mut self, now_ms: u64) -> Option<Event> {
        let mut state = self.state(now_ms);

        if let Some(prev) = self.last_poll_ms {
            state.total_ms = state.total_ms.saturating_add(now_ms.saturating_sub(prev));
        }
        self.last_poll_ms = Some(now_ms);

        // One penalty per day: filter_end_ms stays non-zero after expiry.
        let crossed =
            state.filter_end_ms == 0 && state.total_ms >= self.threshold_ms();
        if crossed {
            state.filter_end_ms = now_ms + self.filter_duration_ms();
        }
        self.save(&state);

        crossed.then(|| Event::GrayscaleActivated {
            filter_until_ms: state.filter_end_ms,
            at: clock::datetime(now_ms),
        })
    }

    /// Expiry sweep. Returns the expiry event on the poll that finds the
    /// window over; later calls return None.
    pub fn check_expired(&self, now_ms: u64) -> Option<Event> {
        let state = self.state(now_ms);
        if state.filter_end_ms == 0 || now_ms < state.filter_end_ms {
            return None;
        }
        // Seen-expired marker so the event fires once.
        let mut cleared = state;
        cleared.filter_end_ms = 1;
        self.save(&cleared);
        Some(Event::GrayscaleExpired {
            at: clock::datetime(now_ms),
        })
    }

    fn threshold_ms(&self) -> u64 {
        self.config.threshold_min * 60 * 1000
    }

    fn filter_duration_ms(&self) -> u64 {
        self.config.filter_duration_min * 60 * 1000
    }

    fn load(&self, now_ms: u64) -> GrayscaleState {
        match get_json(self.store, keys::GRAYSCALE_STATE) {
            Ok(Some(state)) => state,
            Ok(None) => GrayscaleState::fresh(now_ms),
            Err(e) => {
                log::warn!("grayscale state unreadable, starting fresh: {e}");
                GrayscaleState::fresh(now_ms)
            }
        }
    }

    fn save(&self, state: &GrayscaleState) {
        if let Err(e) = set_json(self.store, keys::GRAYSCALE_STATE, state) {
            log::warn!("failed to persist grayscale state: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const T0: u64 = 1_705_320_000_000; // 2024-01-15T12:00:00Z
    const MIN: u64 = 60_000;
    const POLL: u64 = 30_000;
    const DAY: u64 = 24 * 60 * MIN;

    fn penalty(store: &MemoryStore) -> GrayscalePenalty<'_> {
        GrayscalePenalty::new(store, GrayscaleConfig::default())
    }

    /// Drive polls at the 30s cadence until `until`.
    fn poll_until(p: &mut GrayscalePenalty<'_>, from: u64, until: u64) -> Option<Event> {
        let mut fired = None;
        let mut t = from;
        while t <= until {
            if let Some(e) = p.poll(t) {
                fired = Some(e);
            }
            t += POLL;
        }
        fired
    }

    #[test]
    fn activates_after_five_minutes_of_polling() {
        let store = MemoryStore::new();
        let mut p = penalty(&store);

        let fired = poll_until(&mut p, T0, T0 + 5 * MIN);
        match fired {
            Some(Event::GrayscaleActivated { filter_until_ms, .. }) => {
                assert_eq!(filter_until_ms, T0 + 5 * MIN + 60 * MIN);
            }
            other => panic!("expected activation, got {other:?}"),
        }
        assert!(p.is_filter_active(T0 + 10 * MIN));
        assert!(p.is_filter_active(T0 + 64 * MIN));
        assert!(!p.is_filter_active(T0 + 66 * MIN));
    }

    #[test]
    fn activation_fires_once() {
        let store = MemoryStore::new();
        let mut p = penalty(&store);
        poll_until(&mut p, T0, T0 + 5 * MIN);
        // Keep polling well past the threshold: no second activation.
        assert!(poll_until(&mut p, T0 + 5 * MIN + POLL, T0 + 20 * MIN).is_none());
    }

    #[test]
    fn below_threshold_never_activates() {
        let store = MemoryStore::new();
        let mut p = penalty(&store);
        assert!(poll_until(&mut p, T0, T0 + 4 * MIN).is_none());
        assert!(!p.is_filter_active(T0 + 4 * MIN));
    }

    #[test]
    fn expiry_event_fires_once() {
        let store = MemoryStore::new();
        let mut p = penalty(&store);
        poll_until(&mut p, T0, T0 + 5 * MIN);

        let end = T0 + 5 * MIN + 60 * MIN;
        assert!(p.check_expired(end - MIN).is_none());
        assert!(matches!(
            p.check_expired(end + MIN),
            Some(Event::GrayscaleExpired { .. })
        ));
        assert!(p.check_expired(end + 2 * MIN).is_none());
        assert!(!p.is_filter_active(end + MIN));
    }

    #[test]
    fn daily_reset_clears_total_and_penalty() {
        let store = MemoryStore::new();
        let mut p = penalty(&store);
        poll_until(&mut p, T0, T0 + 5 * MIN);
        assert!(p.is_filter_active(T0 + 10 * MIN));

        // Next day: fresh state, no filter, total zero.
        let tomorrow = T0 + DAY;
        let state = p.state(tomorrow);
        assert_eq!(state.total_ms, 0);
        assert_eq!(state.filter_end_ms, 0);
        assert!(!p.is_filter_active(tomorrow));
    }

    #[test]
    fn accumulation_spans_page_loads() {
        let store = MemoryStore::new();
        {
            let mut p = penalty(&store);
            poll_until(&mut p, T0, T0 + 3 * MIN);
        }
        // New page load: a fresh instance continues from persisted total.
        let mut p = penalty(&store);
        let fired = poll_until(&mut p, T0 + 3 * MIN, T0 + 5 * MIN + POLL);
        assert!(fired.is_some());
    }
}
