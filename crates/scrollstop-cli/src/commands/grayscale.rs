use clap::Subcommand;
use scrollstop_core::storage::Config;
use scrollstop_core::{clock, GrayscalePenalty};

#[derive(Subcommand)]
pub enum GrayscaleAction {
    /// Today's accumulated time and filter state
    Status,
    /// Run one accumulation poll
    Poll,
    /// Run the expiry sweep
    Sweep,
}

pub fn run(action: GrayscaleAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store()?;
    let config = Config::load_or_default();
    let mut penalty = GrayscalePenalty::new(&store, config.grayscale);
    let now_ms = clock::now_ms();

    match action {
        GrayscaleAction::Status => {
            let state = penalty.state(now_ms);
            println!("{}", serde_json::to_string_pretty(&state)?);
            println!(
                "filter: {}",
                if penalty.is_filter_active(now_ms) {
                    "active"
                } else {
                    "off"
                }
            );
        }
        GrayscaleAction::Poll => match penalty.poll(now_ms) {
            Some(event) => println!("{}", serde_json::to_string(&event)?),
            None => println!("ok"),
        },
        GrayscaleAction::Sweep => match penalty.check_expired(now_ms) {
            Some(event) => println!("{}", serde_json::to_string(&event)?),
            None => println!("ok"),
        },
    }
    Ok(())
}
