//! Per-page elapsed-time tracking.
//!
//! Accumulates seconds of visible, focused time on tracked pages into a
//! single daily counter, persisted across reloads. The host calls
//! [`ElapsedTimeTracker::start`] on visible/focus and
//! [`ElapsedTimeTracker::stop`] on hidden/blur; `stop` flushes the partial
//! session. The floating indicator's position and visibility live here
//! too, as does the drag-vs-tap pointer classification.

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::storage::{config::TrackerConfig, get_json, keys, set_json, KvStore};

/// Presentation mode. `TimerOnly` only changes how the host renders the
/// indicator; tracking semantics are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerMode {
    Normal,
    TimerOnly,
}

/// Persisted indicator position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPosition {
    pub x: f64,
    pub y: f64,
}

/// What a pointer-down/up sequence meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerIntent {
    /// Short press without movement: hide the indicator.
    Tap,
    /// Movement beyond the drag threshold: reposition the indicator.
    Drag,
}

/// Classify a completed pointer sequence. Movement beyond the drag
/// threshold wins regardless of how long the press took; otherwise a
/// release within the tap window is a tap, and anything else is neither.
pub fn classify_pointer(
    moved_px: f64,
    held_ms: u64,
    config: &TrackerConfig,
) -> Option<PointerIntent> {
    if moved_px > config.drag_threshold_px {
        Some(PointerIntent::Drag)
    } else if held_ms <= config.tap_max_ms {
        Some(PointerIntent::Tap)
    } else {
        None
    }
}

/// Daily accumulator of active page time.
pub struct ElapsedTimeTracker<'a> {
    store: &'a dyn KvStore,
    mode: TrackerMode,
    session_started_ms: Option<u64>,
}

impl<'a> ElapsedTimeTracker<'a> {
    pub fn new(store: &'a dyn KvStore, mode: TrackerMode) -> Self {
        Self {
            store,
            mode,
            session_started_ms: None,
        }
    }

    pub fn mode(&self) -> TrackerMode {
        self.mode
    }

    /// Reconcile the daily reset and return the accumulated total so far.
    /// Call once per page load before anything else.
    pub fn init(&mut self, now_ms: u64) -> u64 {
        self.reconcile_daily_reset(now_ms);
        self.accumulated_secs()
    }

    /// Begin a session (page became visible and focused). A second start
    /// without an intervening stop is a no-op.
    pub fn start(&mut self, now_ms: u64) {
        if self.session_started_ms.is_none() {
            self.session_started_ms = Some(now_ms);
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.session_started_ms.is_some()
    }

    /// End the session (hidden/blur), flushing it into the persisted
    /// total. Returns the session length in milliseconds so the caller
    /// can feed news accounting.
    pub fn stop(&mut self, now_ms: u64) -> u64 {
        let Some(started) = self.session_started_ms.take() else {
            return 0;
        };
        let session_ms = now_ms.saturating_sub(started);
        self.reconcile_daily_reset(now_ms);
        let total = self
            .accumulated_secs()
            .saturating_add(session_ms / 1000);
        self.persist_secs(total);
        session_ms
    }

    /// Accumulated total including the live session, with the daily reset
    /// applied.
    pub fn total_secs(&mut self, now_ms: u64) -> u64 {
        self.reconcile_daily_reset(now_ms);
        let live = self
            .session_started_ms
            .map(|started| now_ms.saturating_sub(started) / 1000)
            .unwrap_or(0);
        self.accumulated_secs() + live
    }

    /// Persisted indicator position, if the user ever dragged it.
    pub fn position(&self) -> Option<IndicatorPosition> {
        get_json(self.store, keys::TIMER_POSITION).ok().flatten()
    }

    /// Persist a new position (after a drag).
    pub fn set_position(&self, position: IndicatorPosition) {
        if let Err(e) = set_json(self.store, keys::TIMER_POSITION, &position) {
            log::warn!("failed to persist timer position: {e}");
        }
    }

    /// Indicator visibility; defaults to visible.
    pub fn visible(&self) -> bool {
        get_json(self.store, keys::TIMER_VISIBLE)
            .ok()
            .flatten()
            .unwrap_or(true)
    }

    /// Hide the indicator (after a tap). Persisted so it stays hidden
    /// across reloads.
    pub fn hide(&self) {
        if let Err(e) = set_json(self.store, keys::TIMER_VISIBLE, &false) {
            log::warn!("failed to persist timer visibility: {e}");
        }
    }

    pub fn show(&self) {
        if let Err(e) = set_json(self.store, keys::TIMER_VISIBLE, &true) {
            log::warn!("failed to persist timer visibility: {e}");
        }
    }

    fn accumulated_secs(&self) -> u64 {
        get_json(self.store, keys::ACCUMULATED_SECS)
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    fn persist_secs(&self, secs: u64) {
        if let Err(e) = set_json(self.store, keys::ACCUMULATED_SECS, &secs) {
            log::warn!("failed to persist accumulated time: {e}");
        }
    }

    /// Zero the counter when the stored reset date is not today; a second
    /// call the same day is a no-op on the counter.
    fn reconcile_daily_reset(&self, now_ms: u64) {
        let today = clock::date_str(now_ms);
        let stored: Option<String> = get_json(self.store, keys::LAST_RESET_DATE).ok().flatten();
        if stored.as_deref() == Some(today.as_str()) {
            return;
        }
        self.persist_secs(0);
        if let Err(e) = set_json(self.store, keys::LAST_RESET_DATE, &today) {
            log::warn!("failed to persist reset date: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const T0: u64 = 1_705_320_000_000; // 2024-01-15T12:00:00Z
    const SEC: u64 = 1000;
    const DAY: u64 = 24 * 60 * 60 * SEC;

    #[test]
    fn accumulates_across_sessions() {
        let store = MemoryStore::new();
        let mut t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        assert_eq!(t.init(T0), 0);

        t.start(T0);
        assert_eq!(t.stop(T0 + 90 * SEC), 90 * SEC);
        t.start(T0 + 120 * SEC);
        assert_eq!(t.stop(T0 + 150 * SEC), 30 * SEC);

        assert_eq!(t.total_secs(T0 + 150 * SEC), 120);
    }

    #[test]
    fn survives_reload_within_same_day() {
        let store = MemoryStore::new();
        {
            let mut t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
            t.init(T0);
            t.start(T0);
            t.stop(T0 + 60 * SEC);
        }
        // New page load, same store.
        let mut t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        assert_eq!(t.init(T0 + 120 * SEC), 60);
    }

    #[test]
    fn total_includes_live_session() {
        let store = MemoryStore::new();
        let mut t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        t.init(T0);
        t.start(T0);
        assert_eq!(t.total_secs(T0 + 45 * SEC), 45);
        assert!(t.is_tracking());
    }

    #[test]
    fn double_start_is_noop() {
        let store = MemoryStore::new();
        let mut t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        t.init(T0);
        t.start(T0);
        t.start(T0 + 30 * SEC);
        assert_eq!(t.stop(T0 + 60 * SEC), 60 * SEC);
    }

    #[test]
    fn stop_without_start_returns_zero() {
        let store = MemoryStore::new();
        let mut t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        t.init(T0);
        assert_eq!(t.stop(T0 + 60 * SEC), 0);
    }

    #[test]
    fn daily_reset_zeroes_counter_once() {
        let store = MemoryStore::new();
        let mut t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        t.init(T0);
        t.start(T0);
        t.stop(T0 + 600 * SEC);
        assert_eq!(t.total_secs(T0 + 600 * SEC), 600);

        // Next day: counter resets, then accumulates fresh.
        assert_eq!(t.total_secs(T0 + DAY), 0);
        t.start(T0 + DAY);
        t.stop(T0 + DAY + 30 * SEC);
        assert_eq!(t.total_secs(T0 + DAY + 30 * SEC), 30);
    }

    #[test]
    fn timer_only_mode_tracks_identically() {
        let store = MemoryStore::new();
        let mut t = ElapsedTimeTracker::new(&store, TrackerMode::TimerOnly);
        t.init(T0);
        t.start(T0);
        t.stop(T0 + 60 * SEC);
        assert_eq!(t.total_secs(T0 + 60 * SEC), 60);
        assert_eq!(t.mode(), TrackerMode::TimerOnly);
    }

    #[test]
    fn position_and_visibility_persist() {
        let store = MemoryStore::new();
        let t = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        assert!(t.position().is_none());
        assert!(t.visible());

        t.set_position(IndicatorPosition { x: 24.0, y: 300.0 });
        t.hide();

        let t2 = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
        assert_eq!(
            t2.position(),
            Some(IndicatorPosition { x: 24.0, y: 300.0 })
        );
        assert!(!t2.visible());
        t2.show();
        assert!(t2.visible());
    }

    #[test]
    fn pointer_classification() {
        let cfg = TrackerConfig::default();
        // Past 5px: drag, however long it took.
        assert_eq!(classify_pointer(12.0, 900, &cfg), Some(PointerIntent::Drag));
        // Within 5px and 300ms: tap.
        assert_eq!(classify_pointer(2.0, 150, &cfg), Some(PointerIntent::Tap));
        // Long still press: neither.
        assert_eq!(classify_pointer(2.0, 500, &cfg), None);
        // Boundary: exactly 5px is not yet a drag.
        assert_eq!(classify_pointer(5.0, 100, &cfg), Some(PointerIntent::Tap));
    }
}
