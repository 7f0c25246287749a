//! Per-page-load coordination.
//!
//! Wires the pieces together for one page load: classify the site,
//! consult the block state, surface the 3-way user choice, and arm the
//! right mix of tracker, detector, grayscale penalty, and reminder.
//!
//! ```text
//! begin -> Untracked (terminal)
//!        | Blocked { .. }            (host shows the blocking screen)
//!        | AwaitingChoice { .. }     (host shows the choice dialog)
//! choose(Continue | TimerOnly | Block) -> Session
//! ```
//!
//! The choice is never persisted: the dialog reappears on every page
//! load, deliberately.

use serde::{Deserialize, Serialize};

use crate::blocks::TimeBlockStore;
use crate::classifier::{Category, Classification, SiteLists};
use crate::detector::DoomscrollDetector;
use crate::events::{Event, EventBus};
use crate::grayscale::GrayscalePenalty;
use crate::news::NewsTimeTracker;
use crate::reminder::Reminder;
use crate::storage::{Config, KvStore};
use crate::tracker::{ElapsedTimeTracker, TrackerMode};

/// The user's answer to the page-load dialog. Transient, in-memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserChoice {
    Continue,
    TimerOnly,
    Block,
}

impl UserChoice {
    /// Parse a host-supplied choice string. Anything unrecognized falls
    /// back to `Continue`, the least restrictive option, so a dialog
    /// defect never strands the user.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "timer-only" => UserChoice::TimerOnly,
            "block" => UserChoice::Block,
            _ => UserChoice::Continue,
        }
    }
}

/// What the host should do right after `begin`.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Page matches no list; nothing to do this load.
    Untracked,
    /// Page is blocked; show the blocking screen with a countdown.
    Blocked {
        remaining_ms: u64,
        /// True when the collective news block (rather than a
        /// per-hostname block) is what's active.
        news_block: bool,
    },
    /// Page is tracked and not blocked; show the 3-way choice dialog.
    AwaitingChoice(Classification),
}

/// The components armed for this page load after the user chose.
pub struct Session<'a> {
    pub tracker: ElapsedTimeTracker<'a>,
    pub detector: Option<DoomscrollDetector>,
    pub grayscale: Option<GrayscalePenalty<'a>>,
    pub reminder: Option<Reminder>,
    /// True when the host should show the blocking screen immediately
    /// (the user chose to block, or a doomscroll was just handled).
    pub show_blocking_screen: bool,
}

struct PageContext {
    hostname: String,
    classification: Classification,
}

/// Orchestrator for one page load. Constructed once per load with the
/// storage and config handed in; everything else is derived.
pub struct Coordinator<'a> {
    store: &'a dyn KvStore,
    config: Config,
    bus: EventBus,
    page: Option<PageContext>,
}

impl<'a> Coordinator<'a> {
    pub fn new(store: &'a dyn KvStore, config: Config) -> Self {
        Self {
            store,
            config,
            bus: EventBus::new(),
            page: None,
        }
    }

    /// Register a listener for every event this coordinator emits.
    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.bus.subscribe(listener);
    }

    /// Classify the page and decide the initial UI state.
    pub fn begin(&mut self, url: &str, hostname: &str, now_ms: u64) -> Phase {
        let lists = SiteLists::load(self.store);
        let classification = lists.classify(url, hostname);
        if !classification.is_tracked() {
            self.page = None;
            return Phase::Untracked;
        }

        self.page = Some(PageContext {
            hostname: hostname.to_string(),
            classification,
        });

        // Collective news block first: it covers every news site at once.
        if classification.is_news {
            let news = self.news_tracker();
            let (blocked, expiry_event) = news.check_blocked(now_ms);
            if let Some(event) = expiry_event {
                self.bus.emit(&event);
            }
            if blocked {
                return Phase::Blocked {
                    remaining_ms: news.remaining_ms(now_ms),
                    news_block: true,
                };
            }
        }

        let blocks = TimeBlockStore::new(self.store);
        if blocks.is_time_blocked(hostname, now_ms) {
            return Phase::Blocked {
                remaining_ms: blocks.remaining_ms(hostname, now_ms),
                news_block: false,
            };
        }

        Phase::AwaitingChoice(classification)
    }

    /// Dispatch on the user's choice. Panics never: an unknown choice has
    /// already been collapsed to `Continue` by `UserChoice::parse_lenient`.
    pub fn choose(&mut self, choice: UserChoice, now_ms: u64) -> Session<'a> {
        let (hostname, classification) = match &self.page {
            Some(page) => (page.hostname.clone(), page.classification),
            // Defensive: choose without a tracked page arms a bare timer.
            None => (String::new(), Classification::default()),
        };

        self.bus.emit(&Event::ChoiceMade {
            hostname: hostname.clone(),
            choice,
            at: crate::clock::datetime(now_ms),
        });

        let mode = if choice == UserChoice::TimerOnly {
            TrackerMode::TimerOnly
        } else {
            TrackerMode::Normal
        };
        let mut tracker = ElapsedTimeTracker::new(self.store, mode);
        tracker.init(now_ms);

        let mut session = Session {
            tracker,
            detector: None,
            grayscale: None,
            reminder: None,
            show_blocking_screen: false,
        };

        match choice {
            UserChoice::Continue => {
                // Detector only for social sites; plain news reading is
                // not swipe territory.
                if classification.is_blocked && !classification.is_news {
                    session.detector = Some(DoomscrollDetector::new(
                        hostname,
                        self.config.detector.clone(),
                    ));
                }
            }
            UserChoice::TimerOnly => {}
            UserChoice::Block => {
                self.block_now(&hostname, classification, now_ms);
                session.show_blocking_screen = true;
            }
        }

        // Everything except an imminent block gets the soft deterrents.
        if choice != UserChoice::Block {
            session.grayscale = Some(GrayscalePenalty::new(
                self.store,
                self.config.grayscale.clone(),
            ));
            if self.config.reminder.enabled {
                session.reminder = Some(Reminder::new(&self.config.reminder, now_ms));
            }
        }

        session
    }

    /// React to a fired detector: the doomscroll event goes out, and the
    /// hostname gets blocked in its classified category.
    pub fn handle_detection(&mut self, detection: Event, now_ms: u64) {
        let hostname = match &detection {
            Event::DoomscrollDetected { hostname, .. } => hostname.clone(),
            _ => return,
        };
        self.bus.emit(&detection);
        let classification = self
            .page
            .as_ref()
            .map(|p| p.classification)
            .unwrap_or_default();
        self.block_now(&hostname, classification, now_ms);
    }

    /// Route a finished tracking session into news accounting. Emits the
    /// limit-exceeded and block-created events on the crossing flush.
    /// Returns true when the news limit was hit by this flush.
    pub fn record_session_end(&mut self, session_ms: u64, now_ms: u64) -> bool {
        let Some(page) = &self.page else {
            return false;
        };
        if !page.classification.is_news || session_ms == 0 {
            return false;
        }

        let news = self.news_tracker();
        match news.add_news_time(session_ms, now_ms) {
            Ok(true) => {
                let data = news.data(now_ms);
                self.bus.emit(&Event::NewsTimeLimitExceeded {
                    total_ms: data.total_ms,
                    at: crate::clock::datetime(now_ms),
                });
                self.bus.emit(&Event::NewsTimeBlockCreated {
                    blocked_until_ms: data.blocked_until_ms,
                    at: crate::clock::datetime(now_ms),
                });
                true
            }
            Ok(false) => false,
            Err(e) => {
                log::warn!("news time accounting failed: {e}");
                false
            }
        }
    }

    /// The messaging-boundary query: is this URL blocked right now?
    /// Re-runs classification and both block checks; read-mostly (lazy
    /// expiry side effects aside).
    pub fn is_url_blocked(&self, url: &str, hostname: &str, now_ms: u64) -> bool {
        let lists = SiteLists::load(self.store);
        let classification = lists.classify(url, hostname);
        if !classification.is_tracked() {
            return false;
        }
        if classification.is_news && self.news_tracker().is_news_time_blocked(now_ms) {
            return true;
        }
        TimeBlockStore::new(self.store).is_time_blocked(hostname, now_ms)
    }

    /// Background sweep: drop expired blocks and emit one removal event
    /// each, so a host poller can reload pages whose block just lifted.
    pub fn cleanup(&mut self, now_ms: u64) {
        match TimeBlockStore::new(self.store).cleanup_expired(now_ms) {
            Ok(events) => self.bus.emit_all(&events),
            Err(e) => log::warn!("block cleanup failed: {e}"),
        }
        let (_, expiry_event) = self.news_tracker().check_blocked(now_ms);
        if let Some(event) = expiry_event {
            self.bus.emit(&event);
        }
    }

    fn block_now(&mut self, hostname: &str, classification: Classification, now_ms: u64) {
        if classification.is_news {
            match self.news_tracker().force_block(now_ms) {
                Ok(event) => self.bus.emit(&event),
                Err(e) => log::warn!("failed to create news block: {e}"),
            }
            return;
        }
        let category = classification.block_category().unwrap_or(Category::Blocked);
        match TimeBlockStore::new(self.store).create_time_block(hostname, category, now_ms) {
            Ok(event) => self.bus.emit(&event),
            Err(e) => log::warn!("failed to create time block for {hostname}: {e}"),
        }
    }

    fn news_tracker(&self) -> NewsTimeTracker<'a> {
        NewsTimeTracker::new(self.store, self.config.news.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    const T0: u64 = 1_705_320_000_000;
    const MIN: u64 = 60_000;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        SiteLists::add(&store, Category::Blocked, "facebook.com").unwrap();
        SiteLists::add(&store, Category::News, "cnn.com").unwrap();
        SiteLists::add(&store, Category::Adult, "pornhub.com").unwrap();
        store
    }

    fn recording_coordinator<'a>(
        store: &'a MemoryStore,
    ) -> (Coordinator<'a>, Rc<RefCell<Vec<Event>>>) {
        let mut coordinator = Coordinator::new(store, Config::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        coordinator.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (coordinator, events)
    }

    #[test]
    fn untracked_page_is_terminal() {
        let store = seeded_store();
        let (mut c, _) = recording_coordinator(&store);
        assert_eq!(
            c.begin("https://example.org/", "example.org", T0),
            Phase::Untracked
        );
    }

    #[test]
    fn tracked_unblocked_page_awaits_choice() {
        let store = seeded_store();
        let (mut c, _) = recording_coordinator(&store);
        match c.begin("https://facebook.com/", "facebook.com", T0) {
            Phase::AwaitingChoice(cls) => assert!(cls.is_blocked),
            other => panic!("expected AwaitingChoice, got {other:?}"),
        }
    }

    #[test]
    fn continue_on_social_arms_detector() {
        let store = seeded_store();
        let (mut c, _) = recording_coordinator(&store);
        c.begin("https://facebook.com/", "facebook.com", T0);
        let session = c.choose(UserChoice::Continue, T0);
        assert!(session.detector.is_some());
        assert!(session.grayscale.is_some());
        assert!(session.reminder.is_some());
        assert!(!session.show_blocking_screen);
        assert_eq!(session.tracker.mode(), TrackerMode::Normal);
    }

    #[test]
    fn continue_on_news_has_no_detector() {
        let store = seeded_store();
        let (mut c, _) = recording_coordinator(&store);
        c.begin("https://cnn.com/", "cnn.com", T0);
        let session = c.choose(UserChoice::Continue, T0);
        assert!(session.detector.is_none());
        assert!(session.grayscale.is_some());
    }

    #[test]
    fn timer_only_never_arms_detector() {
        let store = seeded_store();
        let (mut c, _) = recording_coordinator(&store);
        c.begin("https://facebook.com/", "facebook.com", T0);
        let session = c.choose(UserChoice::TimerOnly, T0);
        assert!(session.detector.is_none());
        assert_eq!(session.tracker.mode(), TrackerMode::TimerOnly);
        assert!(session.reminder.is_some());
    }

    // End-to-end scenario: facebook.com in the blocked list, no existing
    // block, user chooses "block".
    #[test]
    fn block_choice_creates_hour_block_and_blocking_screen() {
        let store = seeded_store();
        let (mut c, events) = recording_coordinator(&store);
        c.begin("https://facebook.com/", "facebook.com", T0);
        let session = c.choose(UserChoice::Block, T0);

        assert!(session.show_blocking_screen);
        assert!(session.grayscale.is_none());
        assert!(session.reminder.is_none());

        let created = events
            .borrow()
            .iter()
            .find_map(|e| match e {
                Event::TimeBlockCreated {
                    hostname,
                    category,
                    duration_ms,
                    ..
                } => Some((hostname.clone(), *category, *duration_ms)),
                _ => None,
            })
            .expect("block created event");
        assert_eq!(created, ("facebook.com".into(), Category::Blocked, 3_600_000));

        // Next load is blocked.
        match c.begin("https://facebook.com/", "facebook.com", T0 + MIN) {
            Phase::Blocked {
                remaining_ms,
                news_block,
            } => {
                assert!(!news_block);
                assert_eq!(remaining_ms, 3_600_000 - MIN);
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn block_choice_on_news_site_blocks_all_news() {
        let store = seeded_store();
        let (mut c, events) = recording_coordinator(&store);
        c.begin("https://cnn.com/", "cnn.com", T0);
        c.choose(UserChoice::Block, T0);

        assert!(events
            .borrow()
            .iter()
            .any(|e| matches!(e, Event::NewsTimeBlockCreated { .. })));

        // Any news site is now blocked, not just cnn.com.
        SiteLists::add(&store, Category::News, "bbc.co.uk").unwrap();
        match c.begin("https://bbc.co.uk/", "bbc.co.uk", T0 + MIN) {
            Phase::Blocked { news_block, .. } => assert!(news_block),
            other => panic!("expected news block, got {other:?}"),
        }
    }

    // End-to-end scenario: 18 minutes of news today, a 3-minute session
    // flush crosses the 20-minute budget.
    #[test]
    fn news_session_flush_trips_limit() {
        let store = seeded_store();
        let (mut c, events) = recording_coordinator(&store);
        NewsTimeTracker::new(&store, Config::default().news)
            .add_news_time(18 * MIN, T0)
            .unwrap();

        c.begin("https://cnn.com/", "cnn.com", T0);
        let mut session = c.choose(UserChoice::Continue, T0);
        session.tracker.start(T0);
        let session_ms = session.tracker.stop(T0 + 3 * MIN);
        assert!(c.record_session_end(session_ms, T0 + 3 * MIN));

        let seen = events.borrow();
        assert!(seen
            .iter()
            .any(|e| matches!(e, Event::NewsTimeLimitExceeded { .. })));
        assert!(seen
            .iter()
            .any(|e| matches!(e, Event::NewsTimeBlockCreated { .. })));
    }

    #[test]
    fn session_flush_on_social_site_skips_news_accounting() {
        let store = seeded_store();
        let (mut c, _) = recording_coordinator(&store);
        c.begin("https://facebook.com/", "facebook.com", T0);
        c.choose(UserChoice::Continue, T0);
        assert!(!c.record_session_end(30 * MIN, T0 + 30 * MIN));
    }

    #[test]
    fn detection_blocks_hostname_in_its_category() {
        let store = seeded_store();
        let (mut c, events) = recording_coordinator(&store);
        c.begin("https://facebook.com/", "facebook.com", T0);
        let mut session = c.choose(UserChoice::Continue, T0);

        let mut detector = session.detector.take().unwrap();
        detector.observe(crate::detector::PageSignal::Scroll { scroll_top: 0.0 }, T0);
        let detection = detector
            .observe(
                crate::detector::PageSignal::Scroll {
                    scroll_top: 5000.0,
                },
                T0,
            )
            .expect("detection fires");
        c.handle_detection(detection, T0);

        let seen = events.borrow();
        assert!(seen
            .iter()
            .any(|e| matches!(e, Event::DoomscrollDetected { .. })));
        assert!(seen.iter().any(
            |e| matches!(e, Event::TimeBlockCreated { hostname, .. } if hostname == "facebook.com")
        ));
    }

    #[test]
    fn lenient_choice_parsing_defaults_to_continue() {
        assert_eq!(UserChoice::parse_lenient("continue"), UserChoice::Continue);
        assert_eq!(UserChoice::parse_lenient("timer-only"), UserChoice::TimerOnly);
        assert_eq!(UserChoice::parse_lenient("block"), UserChoice::Block);
        assert_eq!(UserChoice::parse_lenient("garbage"), UserChoice::Continue);
        assert_eq!(UserChoice::parse_lenient(""), UserChoice::Continue);
    }

    #[test]
    fn is_url_blocked_answers_the_host_query() {
        let store = seeded_store();
        let (mut c, _) = recording_coordinator(&store);
        assert!(!c.is_url_blocked("https://facebook.com/", "facebook.com", T0));

        c.begin("https://facebook.com/", "facebook.com", T0);
        c.choose(UserChoice::Block, T0);
        assert!(c.is_url_blocked("https://facebook.com/", "facebook.com", T0 + MIN));
        assert!(!c.is_url_blocked("https://example.org/", "example.org", T0 + MIN));
    }

    #[test]
    fn cleanup_emits_removal_for_expired_blocks() {
        let store = seeded_store();
        let (mut c, events) = recording_coordinator(&store);
        TimeBlockStore::new(&store)
            .create_time_block("facebook.com", Category::Blocked, T0)
            .unwrap();

        c.cleanup(T0 + 61 * MIN);
        assert!(events.borrow().iter().any(
            |e| matches!(e, Event::TimeBlockRemoved { hostname, .. } if hostname == "facebook.com")
        ));
    }
}
