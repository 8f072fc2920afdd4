mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;
use crate::loader::load_corpus;
use crate::models::Direction;
use crate::pipeline::Pipeline;
use crate::pipeline::window::WindowResolver;
use crate::storage::{AppendOutcome, LogKey, LogStore};

#[derive(Parser)]
#[command(name = "paxlog", about = "Border checkpoint passenger-count collector", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Root of the per-year log directories (overrides storage.logs_dir)
    #[arg(long, env = "PAXLOG_LOGS_DIR", global = true)]
    logs_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all endpoints and append the last window to the log (cron mode)
    Collect,

    /// Fetch and aggregate one direction, print it, write nothing
    Preview {
        #[arg(short, long, value_enum, default_value_t = Direction::Departure)]
        direction: Direction,
    },

    /// Show the current window and the log file it maps to
    Window,

    /// Summarize the whole log corpus
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "paxlog=info,warn",
        1 => "paxlog=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    if let Some(dir) = cli.logs_dir {
        config.storage.logs_dir = dir;
    }

    match cli.command {
        Command::Collect => {
            let _t = utils::Timer::start("Collect");
            let report = Pipeline::new(config)?
                .run()
                .await
                .context("Collection run failed")?;

            info!(
                "Departure: {} groups / {} pax | Arrival: {} groups / {} pax",
                report.departure_groups,
                report.departure_total,
                report.arrival_groups,
                report.arrival_total
            );
            match report.outcome {
                AppendOutcome::Appended { path, entries } => {
                    println!("Recorded {} in {} ({} entries)", report.window, path.display(), entries);
                }
                AppendOutcome::AlreadyRecorded { path } => {
                    println!("Range already exists: {} in {}", report.window, path.display());
                }
            }
        }

        Command::Preview { direction } => {
            let _t = utils::Timer::start("Preview");
            let records = Pipeline::new(config)?
                .collect_direction(direction)
                .await
                .with_context(|| format!("Fetching {direction} endpoints failed"))?;

            print!("{}", utils::render_records(&records));
            println!(
                "{} groups, {} passengers ({})",
                records.len(),
                utils::fmt_number(records.iter().map(|r| r.count).sum()),
                direction
            );
        }

        Command::Window => {
            let resolver = WindowResolver::from_config(&config.window)?;
            let window = resolver.current();
            let path = LogStore::from_config(&config.storage)
                .path_for(&LogKey::new(resolver.log_date(&window)));
            println!("Zone   : {}", resolver.tz());
            println!("Window : {}", window);
            println!("Log    : {}", path.display());
        }

        Command::Stats => {
            let root = &config.storage.logs_dir;
            let corpus = load_corpus(root)
                .with_context(|| format!("Reading logs under {:?}", root))?;

            let departure: u64 = corpus.entries.iter().map(|e| e.total(Direction::Departure)).sum();
            let arrival: u64 = corpus.entries.iter().map(|e| e.total(Direction::Arrival)).sum();
            let span = corpus.span();
            let dups = corpus.duplicate_ranges();

            println!("─────────────────────────────────");
            println!("  paxlog — Log Stats");
            println!("─────────────────────────────────");
            println!("  Files     : {}", corpus.files.len());
            println!("  Windows   : {}", utils::fmt_number(corpus.entries.len() as u64));
            println!("  From      : {}", span.as_ref().map(|s| s.0.as_str()).unwrap_or("—"));
            println!("  To        : {}", span.as_ref().map(|s| s.1.as_str()).unwrap_or("—"));
            println!("  Departure : {}", utils::fmt_number(departure));
            println!("  Arrival   : {}", utils::fmt_number(arrival));
            println!("  Duplicates: {}", dups.len());
            println!("─────────────────────────────────");
            for ([start, end], n) in &dups {
                println!("  [{start}, {end}) ×{n}");
            }
        }
    }

    Ok(())
}
