use clap::Args;
use scrollstop_core::storage::Config;
use scrollstop_core::{clock, Coordinator, PageSignal, Phase, Surface, UserChoice};

/// Replay a synthetic scrolling/swiping session against the real
/// coordinator, blocking the hostname if detection fires.
#[derive(Args)]
pub struct DetectArgs {
    /// Page URL to simulate on
    url: String,
    /// Number of scroll samples to feed
    #[arg(long, default_value = "0")]
    scrolls: u32,
    /// Scroll distance per sample (px)
    #[arg(long, default_value = "500")]
    step: f64,
    /// Number of swipe gestures to feed
    #[arg(long, default_value = "0")]
    swipes: u32,
    /// Short-form surface for swipes: reels or shorts
    #[arg(long)]
    surface: Option<String>,
}

pub fn run(args: DetectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store()?;
    let (url, hostname) = super::split_url(&args.url);
    let now_ms = clock::now_ms();

    let mut coordinator = Coordinator::new(&store, Config::load_or_default());
    coordinator.subscribe(|event| {
        println!("{}", serde_json::to_string(event).unwrap_or_default());
    });

    match coordinator.begin(&url, &hostname, now_ms) {
        Phase::Untracked => {
            println!("{hostname} is not on any list; nothing to detect");
            return Ok(());
        }
        Phase::Blocked { .. } => {
            println!("{hostname} is already blocked");
            return Ok(());
        }
        Phase::AwaitingChoice(_) => {}
    }

    let mut session = coordinator.choose(UserChoice::Continue, now_ms);
    let Some(mut detector) = session.detector.take() else {
        println!("no detector for this site (news-only pages are not swipe territory)");
        return Ok(());
    };

    if let Some(name) = &args.surface {
        let surface = match name.as_str() {
            "reels" => Surface::Reels,
            "shorts" => Surface::Shorts,
            other => return Err(format!("unknown surface '{other}'").into()),
        };
        detector.set_surface(Some(surface));
    }

    let mut fired = None;
    let mut t = now_ms;
    for i in 0..args.scrolls {
        t += 2000;
        let signal = PageSignal::Scroll {
            scroll_top: f64::from(i) * args.step,
        };
        if let Some(event) = detector.observe(signal, t) {
            fired = Some(event);
            break;
        }
    }
    if fired.is_none() {
        for _ in 0..args.swipes {
            t += 2000;
            let signal = PageSignal::Touch {
                distance_px: 60.0,
                duration_ms: 300,
            };
            if let Some(event) = detector.observe(signal, t) {
                fired = Some(event);
                break;
            }
        }
    }

    match fired {
        Some(event) => coordinator.handle_detection(event, t),
        None => println!(
            "no detection ({}px scrolled, {} swipes)",
            detector.scroll_total_px(),
            detector.swipe_count()
        ),
    }
    Ok(())
}
