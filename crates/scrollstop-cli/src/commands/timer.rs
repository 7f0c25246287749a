use clap::Subcommand;
use scrollstop_core::storage::{get_json, set_json, Config, KvStore};
use scrollstop_core::{clock, ElapsedTimeTracker, NewsTimeTracker, TrackerMode};

/// Where the CLI keeps its open session between invocations, the same
/// way a page keeps its session in memory between visibility changes.
const SESSION_KEY: &str = "cli_session_started_ms";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a tracking session
    Start,
    /// Stop the session and flush it into today's total
    Stop {
        /// Also credit the session against the news budget
        #[arg(long)]
        news: bool,
    },
    /// Today's accumulated time
    Status,
    /// Hide the floating indicator
    Hide,
    /// Show the floating indicator
    Show,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store()?;
    let mut tracker = ElapsedTimeTracker::new(&store, TrackerMode::Normal);
    let now_ms = clock::now_ms();

    match action {
        TimerAction::Start => {
            tracker.init(now_ms);
            set_json(&store, SESSION_KEY, &now_ms)?;
            println!("tracking");
        }
        TimerAction::Stop { news } => {
            let started: Option<u64> = get_json(&store, SESSION_KEY)?;
            let Some(started) = started else {
                println!("no open session");
                return Ok(());
            };
            tracker.init(now_ms);
            tracker.start(started);
            let session_ms = tracker.stop(now_ms);
            store.remove(SESSION_KEY)?;
            println!("flushed {}s", session_ms / 1000);

            if news {
                let config = Config::load_or_default();
                let tracker = NewsTimeTracker::new(&store, config.news);
                if tracker.add_news_time(session_ms, now_ms)? {
                    println!("news limit exceeded: news sites blocked");
                }
            }
        }
        TimerAction::Status => {
            let mut total = tracker.init(now_ms);
            if let Some(started) = get_json::<u64>(&store, SESSION_KEY)? {
                total += now_ms.saturating_sub(started) / 1000;
            }
            println!("{}s today", total);
            println!(
                "indicator: {}",
                if tracker.visible() { "visible" } else { "hidden" }
            );
        }
        TimerAction::Hide => {
            tracker.hide();
            println!("hidden");
        }
        TimerAction::Show => {
            tracker.show();
            println!("visible");
        }
    }
    Ok(())
}
