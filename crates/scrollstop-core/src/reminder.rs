//! Periodic on-page reminder.
//!
//! A fixed-interval nudge while a tracked page stays open. Per page load,
//! in-memory only; the host ticks it alongside its other timers.

use crate::clock;
use crate::events::Event;
use crate::storage::config::ReminderConfig;

pub struct Reminder {
    interval_ms: u64,
    enabled: bool,
    last_fired_ms: u64,
}

impl Reminder {
    pub fn new(config: &ReminderConfig, now_ms: u64) -> Self {
        Self {
            interval_ms: config.interval_min * 60 * 1000,
            enabled: config.enabled,
            last_fired_ms: now_ms,
        }
    }

    /// Returns the nudge event each time a full interval has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.enabled || now_ms < self.last_fired_ms + self.interval_ms {
            return None;
        }
        self.last_fired_ms = now_ms;
        Some(Event::ReminderDue {
            interval_ms: self.interval_ms,
            at: clock::datetime(now_ms),
        })
    }
}
