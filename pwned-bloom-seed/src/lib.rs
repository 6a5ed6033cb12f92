//! Builds the bloom filter that `pwned-offline` consults before searching the
//! corpus.
//!
//! The corpus is streamed once, front to back, and the first 40 bytes of every
//! record (the uppercase SHA-1 hex) are added to a write-mode
//! [`BloomFilter`](pwned_offline::BloomFilter). The checker adds nothing else and
//! queries with exactly the same bytes, so a filter built here never produces
//! false negatives for the corpus it was built from.
//!
//! Only one process may write a filter file at a time, and no checker should
//! have it open while it is being built.
//!
//! # Usage
//!
//! ```sh
//! pwned-bloom-seed --corpus ./data/pwned-passwords-sha1-ordered-by-hash-v7.txt
//! ```

pub mod error;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use pwned_offline::search::HASH_LEN;
use pwned_offline::{BloomFilter, Scope};

pub use error::Error;

/// Read buffer for streaming the corpus.
const READ_BUFFER_SIZE: usize = 1 << 20;

/// Counters from one population pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedStats {
    /// Records whose hash was added to the filter.
    pub added: u64,
    /// Lines too short or not starting with 40 hex characters.
    pub skipped: u64,
}

/// Adds every record in `reader` to `bloom`, which must be open for writing.
///
/// `progress` is advanced by the number of bytes consumed so another thread can
/// report on it.
pub fn seed_from_reader<R: BufRead>(
    bloom: &mut BloomFilter,
    mut reader: R,
    progress: &AtomicU64,
) -> Result<SeedStats, Error> {
    let mut stats = SeedStats::default();
    let mut line = Vec::with_capacity(64);

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        progress.fetch_add(n as u64, Ordering::Relaxed);

        match record_hash(&line) {
            Some(hash) => {
                bloom.add(&hash)?;
                stats.added += 1;
            }
            None => stats.skipped += 1,
        }
    }

    Ok(stats)
}

/// Streams the corpus at `corpus` into the filter at `bloom_path`, creating the
/// filter file if needed.
pub fn seed_file(
    corpus: &Path,
    bloom_path: &Path,
    progress: &AtomicU64,
) -> Result<SeedStats, Error> {
    let file = File::open(corpus).map_err(|source| Error::Read { path: corpus.into(), source })?;
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

    let mut bloom = BloomFilter::create(bloom_path)?;
    let mut bloom = bloom.scoped()?;

    seed_from_reader(&mut bloom, reader, progress)
}

/// Checks that `corpus` can be read and clears the way for a new filter at
/// `output`, returning the corpus size in bytes.
///
/// An existing `output` is removed only when `force` is set, and only once the
/// corpus has been found.
pub fn prepare_output(corpus: &Path, output: &Path, force: bool) -> Result<u64, Error> {
    let total_bytes = std::fs::metadata(corpus)
        .map_err(|source| Error::Read { path: corpus.into(), source })?
        .len();

    // Bits are only ever set, so reusing an old filter would keep stale entries.
    if output.exists() {
        if !force {
            return Err(Error::FileExists { path: output.into() });
        }
        std::fs::remove_file(output)?;
    }

    Ok(total_bytes)
}

/// The uppercased hash at the start of a record, if the line has one.
fn record_hash(line: &[u8]) -> Option<[u8; HASH_LEN]> {
    let prefix = line.get(..HASH_LEN)?;
    let mut hash = [0u8; HASH_LEN];
    for (out, &c) in hash.iter_mut().zip(prefix) {
        if !c.is_ascii_hexdigit() {
            return None;
        }
        *out = c.to_ascii_uppercase();
    }
    Some(hash)
}
