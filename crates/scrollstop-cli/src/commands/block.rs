use clap::Subcommand;
use scrollstop_core::{clock, Category, TimeBlockStore};

#[derive(Subcommand)]
pub enum BlockAction {
    /// List active blocks
    List,
    /// Block a hostname now
    Create {
        hostname: String,
        /// Category: blocked, news, or adult (default blocked)
        #[arg(long, default_value = "blocked")]
        category: String,
    },
    /// Lift a block early
    Remove { hostname: String },
    /// Remaining block time for a hostname
    Remaining { hostname: String },
    /// Sweep expired blocks
    Cleanup,
}

pub fn run(action: BlockAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store()?;
    let blocks = TimeBlockStore::new(&store);
    let now_ms = clock::now_ms();

    match action {
        BlockAction::List => {
            for (hostname, block) in blocks.active_blocks(now_ms) {
                println!(
                    "{hostname}  {}  {}s remaining",
                    block.category.as_str(),
                    block.remaining_ms(now_ms) / 1000
                );
            }
        }
        BlockAction::Create { hostname, category } => {
            let category: Category = category.parse()?;
            let event = blocks.create_time_block(&hostname, category, now_ms)?;
            println!("{}", serde_json::to_string(&event)?);
        }
        BlockAction::Remove { hostname } => match blocks.remove_time_block(&hostname, now_ms)? {
            Some(event) => println!("{}", serde_json::to_string(&event)?),
            None => println!("no block for {hostname}"),
        },
        BlockAction::Remaining { hostname } => {
            println!("{}", blocks.remaining_ms(&hostname, now_ms) / 1000);
        }
        BlockAction::Cleanup => {
            let events = blocks.cleanup_expired(now_ms)?;
            println!("removed {} expired block(s)", events.len());
        }
    }
    Ok(())
}
