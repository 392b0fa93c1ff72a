mod config;
mod db;
mod error;
mod fetch;
mod history;
mod parser;
mod tracker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::info;

use config::Settings;
use db::SqliteStore;
use error::TrackError;
use fetch::{Fetcher, PageSource};
use history::PriceHistory;
use tracker::{TrackReport, Tracker};

#[derive(Parser)]
#[command(name = "price_tracker", about = "Track Amazon and Flipkart product prices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch product pages, record their current price and show history
    Track {
        /// Product URLs (Amazon or Flipkart)
        #[arg(required = true)]
        urls: Vec<String>,
        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the recent price history of a product
    History {
        url: String,
        #[arg(long)]
        json: bool,
    },
    /// List every tracked product with its latest price
    Products,
    /// Run extraction over saved HTML files without fetching or storing
    Extract {
        /// URL the pages were saved from (selects the site's locators)
        #[arg(short, long)]
        url: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

type AppTracker = Tracker<Fetcher, SqliteStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Track { urls, json } => {
            let tracker = Arc::new(open_tracker(&settings)?);
            let results = track_all(tracker, urls, settings.concurrency).await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            for (url, result) in &results {
                match result {
                    Ok(report) if json => println!("{}", serde_json::to_string_pretty(report)?),
                    Ok(report) => print_report(report),
                    Err(e) => eprintln!("{}: {}", url, e),
                }
            }
            if results.len() > 1 {
                println!("\n{} tracked, {} failed.", results.len() - failed, failed);
            }
            if failed == results.len() {
                anyhow::bail!("no product could be tracked");
            }
            Ok(())
        }
        Commands::History { url, json } => {
            let tracker = open_tracker(&settings)?;
            let history = tracker.history(&url)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                println!("No price history for {}", url);
            } else {
                print_history(&history);
            }
            Ok(())
        }
        Commands::Products => {
            let store = SqliteStore::open(&settings.database_path)?;
            let rows = store.tracked_products()?;
            if rows.is_empty() {
                println!("No products tracked yet. Run 'track <URL>' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<32} | {:>12} | {:>5} | {:<16} | {}",
                "#", "Title", "Price", "Seen", "Last seen (IST)", "URL"
            );
            println!("{}", "-".repeat(100));
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<32} | {:>12} | {:>5} | {:<16} | {}",
                    i + 1,
                    truncate(&r.title, 32),
                    format!("{}{:.2}", parser::price::CURRENCY_SYMBOL, r.latest_price),
                    r.observations,
                    history::display_label(r.last_seen),
                    r.url
                );
            }
            println!("\n{} products", rows.len());
            Ok(())
        }
        Commands::Extract { url, files, json } => extract_files(&url, &files, json),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {}", format_duration(elapsed));
    }

    result
}

fn open_tracker(settings: &Settings) -> anyhow::Result<AppTracker> {
    let store = SqliteStore::open(&settings.database_path)
        .with_context(|| format!("Failed to open database {}", settings.database_path))?;
    let fetcher = Fetcher::from_settings(settings)?;
    info!(strategy = fetcher.name(), "Fetch strategy selected");
    Ok(Tracker::new(fetcher, store, settings.lock_same_url))
}

/// Track URLs concurrently, collecting results as they finish.
async fn track_all(
    tracker: Arc<AppTracker>,
    urls: Vec<String>,
    concurrency: usize,
) -> Vec<(String, Result<TrackReport, TrackError>)> {
    let total = urls.len();
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let pb = if total > 1 {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(String, Result<TrackReport, TrackError>)>(concurrency * 2);

    for url in urls {
        let tracker = Arc::clone(&tracker);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = sem.acquire().await;
            let result = tracker.track(&url).await;
            let _ = tx.send((url, result)).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut results = Vec::with_capacity(total);
    while let Some(item) = rx.recv().await {
        results.push(item);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let ok = results.iter().filter(|(_, r)| r.is_ok()).count();
    info!("Tracked {} URLs ({} ok, {} errors)", total, ok, total - ok);
    results
}

fn extract_files(url: &str, files: &[PathBuf], json: bool) -> anyhow::Result<()> {
    use rayon::prelude::*;

    let results: Vec<_> = files
        .par_iter()
        .map(|path| {
            let details = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))
                .map(|html| parser::process_page(url, &html));
            (path, details)
        })
        .collect();

    for (path, details) in results {
        let details = details?;
        if json {
            println!("{}", serde_json::to_string_pretty(&details)?);
            continue;
        }
        println!("{} [{}]", path.display(), details.site);
        println!("  Title: {}", details.fields.title);
        println!(
            "  Price: {} -> {}{}",
            details.fields.price_text,
            details.price,
            if details.has_valid_price() { "" } else { " (invalid, would not be stored)" }
        );
        println!("  Image: {}", details.fields.image_url);
    }
    Ok(())
}

fn print_report(report: &TrackReport) {
    println!("\n{}", report.title);
    println!("  Price: {}", report.display_price);
    println!("  Image: {}", report.image_url);
    println!("  URL:   {}", report.url);
    if !report.stored {
        println!("  (no valid price found, nothing recorded)");
    }
    if report.history.is_empty() {
        println!("  No price history yet.");
    } else {
        print_history(&report.history);
    }
}

fn print_history(history: &PriceHistory) {
    println!("  History (IST, last {} observations):", history.len());
    for (label, price) in history.labels.iter().zip(&history.prices) {
        println!("    {}  {}{:.2}", label, parser::price::CURRENCY_SYMBOL, price);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
