//! AgriHedge live market session
//!
//! Starts the simulated market, follows it for the configured number of
//! seconds while logging every tick and the farmer's hedge P&L, then prints
//! the dashboard.
//!
//! Usage:
//!   cargo run --bin agrihedge -- [config.toml]

use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agrihedge::alerts::default_alerts;
use agrihedge::contracts::ContractBook;
use agrihedge::dashboard::DashboardSummary;
use agrihedge::hedging::HedgeBook;
use agrihedge::output::write_history_csv;
use agrihedge::storage::FileStore;
use agrihedge::{AppConfig, MarketSimulator};
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(config: AppConfig) -> agrihedge::Result<()> {
    let simulator = match config.session.seed {
        Some(seed) => MarketSimulator::with_seed(config.market.clone(), seed)?,
        None => MarketSimulator::new(config.market.clone())?,
    };

    let mut store = FileStore::open(&config.storage.path)?;
    let mut hedges = HedgeBook::load(&store)?;
    let contracts = ContractBook::load(&store)?;
    info!(
        store = %store.path().display(),
        hedges = hedges.len(),
        contracts = contracts.len(),
        "loaded saved records"
    );

    if hedges.is_empty() {
        let now = Utc::now();
        let position = hedges.hedge(
            now.timestamp_millis().to_string(),
            now.date_naive(),
            "10",
            simulator.current_price(),
        )?;
        info!(
            quantity = position.quantity,
            hedged_price = position.hedged_price,
            "opened practice hedge"
        );
        hedges.save(&mut store)?;
    }

    let book = Arc::new(hedges);
    let book_for_listener = Arc::clone(&book);
    let subscription = simulator.subscribe(move |price| {
        info!(
            price,
            hedge_pl = book_for_listener.total_profit_loss(price),
            "tick"
        );
    });

    simulator.start()?;
    thread::sleep(Duration::from_secs(config.session.run_seconds));
    simulator.stop();
    subscription.unsubscribe();

    let history = simulator.price_history();
    println!("\n=== AgriHedge Dashboard ===\n");
    if let Some(summary) = DashboardSummary::from_history(&history) {
        println!("{summary}");
    }

    println!("\nMarket Alerts:");
    for alert in default_alerts(Utc::now()) {
        println!("  [{:?}] {}: {}", alert.kind, alert.title, alert.message);
    }

    let current = simulator.current_price();
    println!("\nHedge Positions ({}):", book.len());
    for position in book.positions() {
        let pl = position.profit_loss(current);
        println!(
            "  #{} {} x {:.2} @ ₹{}: {} ₹{:.2} (₹{}/quintal)",
            position.id,
            position.date,
            position.quantity,
            position.hedged_price,
            if pl.is_profit() { "Profit" } else { "Loss" },
            pl.total.abs(),
            pl.price_diff.abs()
        );
    }

    println!("\nContracts ({}):", contracts.len());
    for contract in contracts.contracts() {
        println!(
            "  #{} {} {:.2} @ ₹{:.2} = ₹{:.2} [{:?}] {}",
            contract.id,
            contract.buyer_name,
            contract.quantity,
            contract.agreed_price,
            contract.total_value(),
            contract.status,
            contract.transaction_hash
        );
    }

    if let Some(path) = &config.output.history_csv {
        write_history_csv(path, &history)?;
        println!("\nPrice history written to {}", path.display());
    }

    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => AppConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path, e);
            std::process::exit(1);
        }),
        None => AppConfig::default(),
    };

    init_logging(&config.logging.filter);

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
