//! Virtual-time replay of the market
//!
//! Plays a number of ticks instantly from a seed and writes them as CSV,
//! with the full session (config, seed, history, ticks) as JSON beside it.
//!
//! Usage:
//!   cargo run --bin replay -- <ticks> [seed] [out.csv]

use std::env;
use std::path::Path;
use std::process;
use std::time::Instant;

use agrihedge::dashboard::DashboardSummary;
use agrihedge::output::{write_ticks_csv, SessionOutput};
use agrihedge::replay::{run_replay, ReplayPlan};
use agrihedge::MarketConfig;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: {} <ticks> [seed] [out.csv]", args[0]);
        eprintln!("Example: {} 100 42 replay.csv", args[0]);
        process::exit(1);
    }

    let ticks: usize = args[1].parse().unwrap_or_else(|_| {
        eprintln!("ticks must be a non-negative integer, got {}", args[1]);
        process::exit(1);
    });
    let seed: u64 = match args.get(2) {
        Some(s) => s.parse().unwrap_or_else(|_| {
            eprintln!("seed must be a non-negative integer, got {}", s);
            process::exit(1);
        }),
        None => 42,
    };
    let out = args.get(3).cloned().unwrap_or_else(|| "replay.csv".to_string());

    let config = MarketConfig::baseline();
    let plan = ReplayPlan::continuous(ticks, &config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(1);
    });
    let started = Instant::now();
    let result = run_replay(&config, Utc::now().date_naive(), seed, &plan).unwrap_or_else(|e| {
        eprintln!("Replay failed: {}", e);
        process::exit(1);
    });
    info!(
        ticks = result.ticks.len(),
        seed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "replay complete"
    );

    if let Some(summary) = DashboardSummary::from_history(&result.market.history) {
        println!("{summary}");
    }

    if let Err(e) = write_ticks_csv(&out, &result.ticks) {
        eprintln!("Error writing {}: {}", out, e);
        process::exit(1);
    }
    println!("Wrote {} ticks to {}", result.ticks.len(), out);

    let session_path = Path::new(&out).with_extension("json");
    if let Err(e) = SessionOutput::from_replay(&config, &result).write_json(&session_path) {
        eprintln!("Error writing {}: {}", session_path.display(), e);
        process::exit(1);
    }
    println!("Wrote session to {}", session_path.display());
}
