//! Prints every published foreground snapshot until Ctrl+C.
//!
//! Usage:
//!   cargo run --example watch
//!   cargo run --example watch -- --pid 1234

use foreground_tracker::{ForegroundTracker, TrackerConfig, utils};
use tracing_subscriber::EnvFilter;

fn parse_pid() -> Result<Option<u32>, Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--pid" {
            let value = args.next().ok_or("--pid needs a value")?;
            return Ok(Some(value.parse()?));
        }
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut tracker = ForegroundTracker::new(TrackerConfig::default())?;
    let handle = tracker.start()?;

    if let Some(pid) = parse_pid()? {
        let info = handle.lookup(pid);
        for (label, value) in info.snapshot().fields() {
            println!("{label:>10}: {value}");
        }
        tracker.stop().await?;
        return Ok(());
    }

    match utils::system_prefers_dark() {
        Ok(dark) => println!("Dark mode preferred: {dark}"),
        Err(e) => println!("Dark mode preference unknown: {e}"),
    }
    println!("Switch between applications to see foreground changes.");
    println!("Press Ctrl+C to exit.");
    println!();

    let (quit_tx, mut quit_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = quit_tx.send(());
    })?;

    let mut changes = handle.subscribe().await?;
    println!("Current: {}", handle.current_foreground());

    let mut event_count = 0;
    loop {
        tokio::select! {
            _ = quit_rx.recv() => {
                println!("\nReceived Ctrl+C, shutting down...");
                break;
            }
            info = changes.recv() => {
                let Some(info) = info else {
                    println!("Tracker stopped publishing");
                    break;
                };
                event_count += 1;
                println!("#{event_count}: {info}");
                let snapshot = info.snapshot();
                if !snapshot.start_time.is_empty() {
                    println!("    started {} (version {})", snapshot.start_time, snapshot.version);
                }
            }
        }
    }

    tracker.stop().await?;
    println!("Total foreground events: {event_count}");
    Ok(())
}
