//! # ScrollStop Core Library
//!
//! Core engine for ScrollStop, a doomscroll interrupter: it classifies
//! sites against user-managed lists, tracks active time spent on them,
//! detects excessive scrolling/swiping, and hands out time blocks with
//! category-dependent cooldowns. The browser extension shell (or the
//! bundled CLI) is a thin host over this library: the engine makes the
//! decisions, the host renders them.
//!
//! ## Architecture
//!
//! - **Classifier**: loose substring matching of URLs/hostnames against
//!   the blocked/news/adult site lists
//! - **Time blocks**: per-hostname cooldowns (1 h social/news, 4 h adult)
//!   with lazy wall-clock expiry
//! - **Detector**: one-shot scroll/swipe heuristics per page load
//! - **Trackers**: daily accumulators for active page time, news budget,
//!   and the grayscale penalty
//! - **Coordinator**: per-page-load state machine wiring it all together,
//!   publishing every cross-component signal on an in-process event bus
//!
//! All stateful operations take the current time as an argument
//! ([`clock::now_ms`] in production, fixed instants in tests); expiry is
//! checked lazily on read, never scheduled.
//!
//! ## Key Components
//!
//! - [`Coordinator`]: per-page orchestration
//! - [`TimeBlockStore`]: block bookkeeping
//! - [`DoomscrollDetector`]: scroll/swipe detection
//! - [`SqliteStore`]: key-value persistence

pub mod blocks;
pub mod classifier;
pub mod clock;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod events;
pub mod grayscale;
pub mod news;
pub mod reminder;
pub mod storage;
pub mod tracker;

pub use blocks::{TimeBlock, TimeBlockStore};
pub use classifier::{Category, Classification, SiteLists};
pub use coordinator::{Coordinator, Phase, Session, UserChoice};
pub use detector::{DoomscrollDetector, PageSignal, Surface, Trigger};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{Event, EventBus};
pub use grayscale::{GrayscalePenalty, GrayscaleState};
pub use news::{NewsTimeData, NewsTimeTracker};
pub use reminder::Reminder;
pub use storage::{Config, KvStore, MemoryStore, SqliteStore};
pub use tracker::{ElapsedTimeTracker, IndicatorPosition, PointerIntent, TrackerMode};
