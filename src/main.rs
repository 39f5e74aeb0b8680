mod db;
mod fetcher;
mod parser;
mod thread;

use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "brannock",
    about = "Extract structured Brannock size records from sizing-thread exports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a thread export (URL or local file) into the database
    Fetch {
        /// Thread permalink, .json export URL, or path to an export file
        source: String,
    },
    /// Extract size records from stored, unprocessed threads
    Process {
        /// Max threads to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Fetch + process in one pipeline
    Run {
        /// Thread permalink, .json export URL, or path to an export file
        source: String,
    },
    /// Show archive statistics
    Stats,
    /// Brannock sizes seen across threads, with reply and record counts
    Sizes,
    /// Per-last overview of accepted size records
    Overview {
        /// Filter by Brannock size label (e.g. "9.5D", "9.5 Wide")
        #[arg(short, long)]
        size: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch { source } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let id = fetch_one(&conn, &source).await?;
            println!("Stored thread #{} from {}", id, source);
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let threads = db::fetch_unprocessed(&conn, limit)?;
            if threads.is_empty() {
                println!("No unprocessed threads. Run 'fetch' first.");
                return Ok(());
            }
            println!("Processing {} threads...", threads.len());
            let counts = process_threads(&conn, &threads)?;
            counts.print();
            Ok(())
        }
        Commands::Run { source } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            fetch_one(&conn, &source).await?;
            let threads = db::fetch_unprocessed(&conn, None)?;
            let counts = process_threads(&conn, &threads)?;
            counts.print();
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Threads:    {}", s.threads);
            println!("Processed:  {}", s.processed);
            println!("Subthreads: {}", s.subthreads);
            println!("Records:    {}", s.records);
            if let Some(ts) = s.latest_report {
                if let Some(dt) = chrono::DateTime::from_timestamp(ts as i64, 0) {
                    println!("Latest report: {}", dt.format("%Y-%m-%d"));
                }
            }
            Ok(())
        }
        Commands::Sizes => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_sizes(&conn)?;
            if rows.is_empty() {
                println!("No subthreads found. Run 'process' first.");
                return Ok(());
            }
            println!(
                "{:<10} | {:>10} | {:>7} | {:>7}",
                "Brannock", "Subthreads", "Replies", "Records"
            );
            println!("{}", "-".repeat(43));
            for r in &rows {
                println!(
                    "{:<10} | {:>10} | {:>7} | {:>7}",
                    r.brannock, r.subthreads, r.replies, r.records
                );
            }
            Ok(())
        }
        Commands::Overview { size, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, size.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<28} | {:>7} | {:>6} | {:>5} | {:>5} | {:<12} | {:<8}",
                "#", "Last", "Reports", "Mean", "Min", "Max", "Widths", "Intl"
            );
            println!("{}", "-".repeat(92));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<28} | {:>7} | {:>6} | {:>5} | {:>5} | {:<12} | {:<8}",
                    i + 1,
                    truncate(&r.last, 28),
                    r.reports,
                    r.mean_size,
                    r.min_size,
                    r.max_size,
                    truncate(&r.widths, 12),
                    r.intls
                );
            }

            match size {
                Some(s) => println!("\n{} lasts reported at {}", rows.len(), s),
                None => println!("\n{} lasts across all sizes", rows.len()),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn fetch_one(conn: &Connection, source: &str) -> Result<i64> {
    let fetched = fetcher::fetch_thread(source).await?;
    db::upsert_thread(
        conn,
        &fetched.source,
        fetched.title.as_deref(),
        fetched.author.as_deref(),
        &serde_json::to_string(&fetched.raw)?,
    )
}

struct ProcessCounts {
    threads: usize,
    subthreads: usize,
    records: usize,
    errors: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} subthreads and {} size records from {} threads ({} errors).",
            self.subthreads, self.records, self.threads, self.errors,
        );
    }
}

fn process_threads(conn: &Connection, threads: &[db::ThreadRow]) -> Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(threads.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let mut counts = ProcessCounts {
        threads: 0,
        subthreads: 0,
        records: 0,
        errors: 0,
    };

    for chunk in threads.chunks(16) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|t| {
                let parsed = serde_json::from_str::<serde_json::Value>(&t.raw_json)
                    .map_err(anyhow::Error::from)
                    .and_then(|raw| parser::process_thread(t.id, &raw));
                (t, parsed)
            })
            .collect();

        for (t, parsed) in results {
            match parsed {
                Ok(data) => {
                    counts.threads += 1;
                    counts.subthreads += data.subthreads.len();
                    counts.records += data.records.len();
                    db::save_thread_records(conn, t.id, &data.subthreads, &data.records)?;
                }
                Err(e) => {
                    counts.errors += 1;
                    warn!("Thread #{} ({}) failed: {}", t.id, t.url, e);
                }
            }
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    Ok(counts)
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
