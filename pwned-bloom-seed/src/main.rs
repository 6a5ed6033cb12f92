use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pwned_bloom_seed::{Error, prepare_output, seed_file};
use pwned_offline::{DEFAULT_BLOOM_FILE_NAME, DEFAULT_DATA_FILE_NAME, dataset_path_from_env};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often the current ingest rate is logged.
const RATE_LOG_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "pwned-bloom-seed")]
#[command(about = "Build the bloom filter for an offline Pwned Passwords corpus")]
struct Args {
    /// Corpus file, or a directory containing it (default: $PWNED_PASSWORDS_DATA)
    #[arg(short, long)]
    corpus: Option<PathBuf>,

    /// Output filter file (default: next to the corpus)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rebuild the filter even if the output file exists
    #[arg(long)]
    force: bool,

    /// Disable progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut corpus = args.corpus.unwrap_or_else(dataset_path_from_env);
    if corpus.is_dir() {
        corpus.push(DEFAULT_DATA_FILE_NAME);
    }
    let output = args.output.unwrap_or_else(|| corpus.with_file_name(DEFAULT_BLOOM_FILE_NAME));

    let total_bytes = prepare_output(&corpus, &output, args.force)?;

    info!(corpus = %corpus.display(), output = %output.display(), "seeding bloom filter");

    let progress_bar = if !args.no_progress {
        let pb = ProgressBar::new(total_bytes);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%, {eta}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let progress = AtomicU64::new(0);
    let done = AtomicBool::new(false);
    let start = Instant::now();

    let result = std::thread::scope(|s| {
        s.spawn(|| {
            let mut lap = Instant::now();
            let mut lap_bytes = 0u64;
            while !done.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(100));
                let current = progress.load(Ordering::Relaxed);
                if let Some(ref pb) = progress_bar {
                    pb.set_position(current);
                }
                if lap.elapsed() >= RATE_LOG_INTERVAL {
                    let rate = (current - lap_bytes) as f64 / lap.elapsed().as_secs_f64();
                    info!("current rate: {:.1} MiB/s", rate / (1024.0 * 1024.0));
                    lap = Instant::now();
                    lap_bytes = current;
                }
            }
        });

        let result = seed_file(&corpus, &output, &progress);
        done.store(true, Ordering::Relaxed);
        result
    });

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }

    let stats = result?;
    let elapsed = start.elapsed();
    info!(
        added = stats.added,
        skipped = stats.skipped,
        "took {:.1}s, {:.0} records per second",
        elapsed.as_secs_f64(),
        stats.added as f64 / elapsed.as_secs_f64()
    );

    Ok(())
}
