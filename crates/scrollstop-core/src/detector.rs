//! Doomscroll detection.
//!
//! One-shot heuristic over the signals a page produces: cumulative
//! downward scroll distance, and, on short-form video surfaces,
//! swipe gestures and in-app navigations. The host feeds [`PageSignal`]s
//! in; once a threshold is crossed the detector fires a single
//! [`Event::DoomscrollDetected`] and goes permanently quiet for the rest
//! of the page load.
//!
//! The host is also responsible for the periodic (2 s) surface re-check:
//! call [`DoomscrollDetector::set_surface`] whenever the page switches
//! into or out of a short-form surface.

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::events::Event;
use crate::storage::config::DetectorConfig;

/// What crossed the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scroll,
    Swipe,
    Navigation,
}

/// Short-form video surface currently on screen. Platforms get different
/// gesture envelopes: Reels swipes are slower and shorter than Shorts
/// swipes in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Reels,
    Shorts,
}

impl Surface {
    /// Minimum gesture travel to count as a swipe (px).
    pub fn min_swipe_px(self) -> f64 {
        match self {
            Surface::Reels => 30.0,
            Surface::Shorts => 50.0,
        }
    }

    /// Maximum gesture duration to count as a swipe (ms).
    pub fn max_swipe_ms(self) -> u64 {
        match self {
            Surface::Reels => 800,
            Surface::Shorts => 500,
        }
    }
}

/// A page observation fed to the detector by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageSignal {
    /// Current document scroll offset.
    Scroll { scroll_top: f64 },
    /// A completed touch gesture.
    Touch { distance_px: f64, duration_ms: u64 },
    /// An observed in-app navigation (some platforms advance videos
    /// without a distinct touch gesture).
    Navigation,
}

/// One-shot doomscroll detector for a single page load.
#[derive(Debug)]
pub struct DoomscrollDetector {
    hostname: String,
    config: DetectorConfig,
    surface: Option<Surface>,
    last_scroll_top: Option<f64>,
    scroll_total_px: f64,
    swipe_count: u32,
    fired: bool,
}

impl DoomscrollDetector {
    pub fn new(hostname: impl Into<String>, config: DetectorConfig) -> Self {
        Self {
            hostname: hostname.into(),
            config,
            surface: None,
            last_scroll_top: None,
            scroll_total_px: 0.0,
            swipe_count: 0,
            fired: false,
        }
    }

    /// Arm or disarm the swipe path. `None` means the page is not showing
    /// a short-form surface; touch and navigation signals are then
    /// ignored. Counts survive re-arming.
    pub fn set_surface(&mut self, surface: Option<Surface>) {
        self.surface = surface;
    }

    pub fn surface(&self) -> Option<Surface> {
        self.surface
    }

    /// Has the detector already fired? A spent detector ignores all
    /// further signals.
    pub fn is_spent(&self) -> bool {
        self.fired
    }

    pub fn scroll_total_px(&self) -> f64 {
        self.scroll_total_px
    }

    pub fn swipe_count(&self) -> u32 {
        self.swipe_count
    }

    /// Feed one observation. Returns the detection event exactly once,
    /// on the signal that crosses a threshold.
    pub fn observe(&mut self, signal: PageSignal, now_ms: u64) -> Option<Event> {
        if self.fired {
            return None;
        }
        match signal {
            PageSignal::Scroll { scroll_top } => {
                let delta = match self.last_scroll_top {
                    Some(last) => scroll_top - last,
                    None => 0.0,
                };
                self.last_scroll_top = Some(scroll_top);
                // Only downward movement counts toward the limit.
                if delta > 0.0 {
                    self.scroll_total_px += delta;
                    if self.scroll_total_px >= self.config.scroll_limit_px {
                        return Some(self.fire(Trigger::Scroll, now_ms));
                    }
                }
                None
            }
            PageSignal::Touch {
                distance_px,
                duration_ms,
            } => {
                let surface = self.surface?;
                if distance_px >= surface.min_swipe_px() && duration_ms <= surface.max_swipe_ms()
                {
                    self.count_swipe(Trigger::Swipe, now_ms)
                } else {
                    None
                }
            }
            PageSignal::Navigation => {
                self.surface?;
                self.count_swipe(Trigger::Navigation, now_ms)
            }
        }
    }

    fn count_swipe(&mut self, trigger: Trigger, now_ms: u64) -> Option<Event> {
        self.swipe_count += 1;
        if self.swipe_count >= self.config.swipe_limit {
            return Some(self.fire(trigger, now_ms));
        }
        None
    }

    fn fire(&mut self, trigger: Trigger, now_ms: u64) -> Event {
        self.fired = true;
        log::debug!(
            "doomscroll detected on {}: {:?} ({}px scrolled, {} swipes)",
            self.hostname,
            trigger,
            self.scroll_total_px,
            self.swipe_count
        );
        Event::DoomscrollDetected {
            hostname: self.hostname.clone(),
            scroll_distance_px: self.scroll_total_px,
            swipe_count: self.swipe_count,
            trigger,
            at: clock::datetime(now_ms),
        }
    }
}
