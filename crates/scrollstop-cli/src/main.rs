use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "scrollstop", version, about = "ScrollStop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Site list management
    Sites {
        #[command(subcommand)]
        action: commands::sites::SitesAction,
    },
    /// Classify a URL and report its block state
    Status {
        /// Page URL (hostname is derived from it)
        url: String,
    },
    /// Time block management
    Block {
        #[command(subcommand)]
        action: commands::block::BlockAction,
    },
    /// News time budget
    News {
        #[command(subcommand)]
        action: commands::news::NewsAction,
    },
    /// Elapsed-time tracker
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Grayscale penalty state
    Grayscale {
        #[command(subcommand)]
        action: commands::grayscale::GrayscaleAction,
    },
    /// Feed simulated page signals to the detector
    Detect(commands::detect::DetectArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sites { action } => commands::sites::run(action),
        Commands::Status { url } => commands::status::run(&url),
        Commands::Block { action } => commands::block::run(action),
        Commands::News { action } => commands::news::run(action),
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Grayscale { action } => commands::grayscale::run(action),
        Commands::Detect(args) => commands::detect::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
