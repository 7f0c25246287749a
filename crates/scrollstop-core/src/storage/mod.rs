pub mod config;
pub mod store;

pub use config::Config;
pub use store::{get_json, set_json, KvStore, MemoryStore, SqliteStore};

use std::path::PathBuf;

/// Storage key names. Single home for every persisted entry so the flat
/// namespace stays auditable.
pub mod keys {
    pub const BLOCKED_SITES: &str = "blocked_sites";
    pub const NEWS_SITES: &str = "news_sites";
    pub const ADULT_SITES: &str = "adult_sites";
    pub const TIME_BLOCKS: &str = "time_blocks";
    pub const NEWS_TIME_DATA: &str = "news_time_data";
    pub const ACCUMULATED_SECS: &str = "accumulated_secs";
    pub const LAST_RESET_DATE: &str = "last_reset_date";
    pub const TIMER_POSITION: &str = "timer_position";
    pub const TIMER_VISIBLE: &str = "timer_visible";
    pub const GRAYSCALE_STATE: &str = "grayscale_state";
}

/// Returns `~/.config/scrollstop[-dev]/` based on SCROLLSTOP_ENV.
///
/// Set SCROLLSTOP_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SCROLLSTOP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("scrollstop-dev")
    } else {
        base_dir.join("scrollstop")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
