pub mod block;
pub mod config;
pub mod detect;
pub mod grayscale;
pub mod news;
pub mod sites;
pub mod status;
pub mod timer;

use scrollstop_core::SqliteStore;

/// Open the shared store all commands work against.
pub fn open_store() -> Result<SqliteStore, Box<dyn std::error::Error>> {
    Ok(SqliteStore::open()?)
}

/// Parse a URL argument into (url, hostname). A bare hostname is
/// accepted and doubles as both.
pub fn split_url(input: &str) -> (String, String) {
    match url::Url::parse(input) {
        Ok(parsed) => {
            let hostname = parsed.host_str().unwrap_or(input).to_string();
            (input.to_string(), hostname)
        }
        Err(_) => (input.to_string(), input.to_string()),
    }
}
