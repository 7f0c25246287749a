use scrollstop_core::storage::Config;
use scrollstop_core::{clock, Coordinator, Phase, SiteLists};

/// The "is this site blocked?" query a host process would send.
pub fn run(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store()?;
    let (url, hostname) = super::split_url(url);
    let now_ms = clock::now_ms();

    let classification = SiteLists::load(&store).classify(&url, &hostname);
    println!(
        "classification: blocked={} news={} adult={}",
        classification.is_blocked, classification.is_news, classification.is_adult
    );

    let mut coordinator = Coordinator::new(&store, Config::load_or_default());
    match coordinator.begin(&url, &hostname, now_ms) {
        Phase::Untracked => println!("state: untracked"),
        Phase::Blocked {
            remaining_ms,
            news_block,
        } => {
            let kind = if news_block { "news block" } else { "time block" };
            println!("state: blocked ({kind}, {}s remaining)", remaining_ms / 1000);
        }
        Phase::AwaitingChoice(_) => println!("state: tracked, not blocked"),
    }
    Ok(())
}
