mod error;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use pwned_offline::{BloomPolicy, Checker, Scope, dataset_path_from_env, sha1_hex};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::error::Error;

/// Exit status when any input is pwned.
const EXIT_PWNED: u8 = 1;
/// Exit status for setup failures, I/O errors and malformed hashes.
const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "pwned-check")]
#[command(about = "Check passwords against a local copy of Pwned Passwords")]
#[command(after_help = "Exits with 1 if any input is pwned, 2 on errors or invalid hashes.")]
struct Args {
    /// Corpus file, or a directory containing it (default: $PWNED_PASSWORDS_DATA)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Bloom filter to consult first (default: discovered next to the corpus)
    #[arg(long, conflicts_with = "no_bloom")]
    bloom: Option<PathBuf>,

    /// Search the corpus without a bloom filter
    #[arg(long)]
    no_bloom: bool,

    /// Treat inputs as SHA-1 hex hashes instead of passwords
    #[arg(long)]
    hash: bool,

    /// Values to check; read one per line from stdin when omitted
    values: Vec<String>,
}

/// What a run found, across all inputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Outcome {
    pwned: u64,
    invalid: u64,
}

impl Outcome {
    fn exit_code(self) -> ExitCode {
        if self.pwned > 0 {
            ExitCode::from(EXIT_PWNED)
        } else if self.invalid > 0 {
            ExitCode::from(EXIT_ERROR)
        } else {
            ExitCode::SUCCESS
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: Args) -> Result<Outcome, Error> {
    let policy = match (args.no_bloom, args.bloom) {
        (true, _) => BloomPolicy::Disabled,
        (false, Some(path)) => BloomPolicy::Path(path),
        (false, None) => BloomPolicy::Automatic,
    };
    let data = args.data.unwrap_or_else(dataset_path_from_env);

    let mut checker = Checker::with_bloom(&data, policy)?;
    debug!(corpus = %checker.corpus_path().display(), bloom = ?checker.bloom_path(), "checker ready");

    let values: Box<dyn Iterator<Item = io::Result<String>>> = if args.values.is_empty() {
        Box::new(io::stdin().lock().lines())
    } else {
        Box::new(args.values.into_iter().map(Ok))
    };

    check_values(&mut checker, values, args.hash, &mut io::stdout().lock())
}

/// Looks up every value and writes one `<hash>\t<verdict>` line per input.
///
/// A malformed hash is reported as `invalid` and the run carries on; setup and
/// I/O failures end it.
fn check_values<W: Write>(
    checker: &mut Checker,
    values: impl Iterator<Item = io::Result<String>>,
    as_hash: bool,
    out: &mut W,
) -> Result<Outcome, Error> {
    let mut checker = checker.scoped()?;
    let mut outcome = Outcome::default();

    for value in values {
        let value = value?;
        let hash = if as_hash {
            value.trim().to_ascii_uppercase()
        } else {
            String::from_utf8_lossy(&sha1_hex(value.as_bytes())).into_owned()
        };

        let start = Instant::now();
        let verdict = match checker.lookup_hash(&hash) {
            Ok(true) => {
                outcome.pwned += 1;
                "pwned"
            }
            Ok(false) => "not pwned",
            Err(pwned_offline::Error::InvalidArgument(reason)) => {
                warn!(input = %hash, %reason, "skipping invalid hash");
                outcome.invalid += 1;
                "invalid"
            }
            Err(e) => return Err(e.into()),
        };
        debug!(elapsed = ?start.elapsed(), "lookup");

        writeln!(out, "{hash}\t{verdict}")?;
    }

    Ok(outcome)
}
