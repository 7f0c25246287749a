//! Application events and the in-process event bus.
//!
//! Every cross-component signal travels as an [`Event`]. Components return
//! the events they produce; the coordinator publishes them on an
//! [`EventBus`] with synchronous FIFO delivery, so ordering is explicit
//! rather than an accident of the host's event queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::Category;
use crate::coordinator::UserChoice;
use crate::detector::Trigger;

/// Every cross-component signal in the system is an Event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Doomscroll threshold crossed on the active page. Fires at most once
    /// per page load.
    DoomscrollDetected {
        hostname: String,
        scroll_distance_px: f64,
        swipe_count: u32,
        trigger: Trigger,
        at: DateTime<Utc>,
    },
    TimeBlockCreated {
        hostname: String,
        category: Category,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    TimeBlockRemoved {
        hostname: String,
        at: DateTime<Utc>,
    },
    /// Daily news budget spent; all news sites become blocked.
    NewsTimeLimitExceeded {
        total_ms: u64,
        at: DateTime<Utc>,
    },
    NewsTimeBlockCreated {
        blocked_until_ms: u64,
        at: DateTime<Utc>,
    },
    NewsTimeBlockRemoved {
        at: DateTime<Utc>,
    },
    GrayscaleActivated {
        filter_until_ms: u64,
        at: DateTime<Utc>,
    },
    GrayscaleExpired {
        at: DateTime<Utc>,
    },
    ReminderDue {
        interval_ms: u64,
        at: DateTime<Utc>,
    },
    /// The user answered the page-load choice dialog.
    ChoiceMade {
        hostname: String,
        choice: UserChoice,
        at: DateTime<Utc>,
    },
}

type Listener = Box<dyn FnMut(&Event)>;

/// Observer registry for [`Event`]s.
///
/// Delivery is synchronous and in subscription order; a listener never sees
/// events out of the order they were emitted.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver an event to every listener, FIFO.
    pub fn emit(&mut self, event: &Event) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    /// Deliver a batch in order.
    pub fn emit_all(&mut self, events: &[Event]) {
        for event in events {
            self.emit(event);
        }
    }
}
