use clap::Subcommand;
use scrollstop_core::storage::Config;
use scrollstop_core::{clock, NewsTimeTracker};

#[derive(Subcommand)]
pub enum NewsAction {
    /// Today's news time and block state
    Status,
    /// Credit news time (minutes) against today's budget
    AddTime { minutes: u64 },
    /// Start the collective news block immediately
    Block,
}

pub fn run(action: NewsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store()?;
    let config = Config::load_or_default();
    let news = NewsTimeTracker::new(&store, config.news.clone());
    let now_ms = clock::now_ms();

    match action {
        NewsAction::Status => {
            let data = news.data(now_ms);
            println!("{}", serde_json::to_string_pretty(&data)?);
            if news.is_news_time_blocked(now_ms) {
                println!("blocked: {}s remaining", news.remaining_ms(now_ms) / 1000);
            } else {
                println!(
                    "budget: {}s of {}s used",
                    data.total_ms / 1000,
                    config.news.daily_limit_min * 60
                );
            }
        }
        NewsAction::AddTime { minutes } => {
            let crossed = news.add_news_time(minutes * 60_000, now_ms)?;
            if crossed {
                println!("limit exceeded: news sites blocked");
            } else {
                println!("ok");
            }
        }
        NewsAction::Block => {
            let event = news.force_block(now_ms)?;
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
