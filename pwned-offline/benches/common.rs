use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use pwned_offline::sha1_hex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Hashes of random 25 character passwords, practically never in the corpus.
/// Uses a fixed seed for reproducible benchmark results.
pub fn random_negative_hashes(rng: &mut StdRng, count: usize) -> Vec<[u8; 40]> {
    (0..count)
        .map(|_| {
            let password: Vec<u8> =
                (0..25).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())]).collect();
            sha1_hex(&password)
        })
        .collect()
}

/// Picks `count` hashes out of the corpus by seeking to random offsets and
/// taking the first full record after each one.
pub fn sample_corpus_hashes(rng: &mut StdRng, corpus: &Path, count: usize) -> Vec<[u8; 40]> {
    let mut file = File::open(corpus).expect("failed to open corpus");
    let total = file.metadata().expect("failed to stat corpus").len();
    let mut buf = [0u8; 256];
    let mut hashes = Vec::with_capacity(count);

    while hashes.len() < count {
        let pos = rng.gen_range(0..total.saturating_sub(buf.len() as u64).max(1));
        file.seek(SeekFrom::Start(pos)).expect("seek failed");
        let n = file.read(&mut buf).expect("read failed");

        let Some(newline) = buf[..n].iter().position(|&b| b == b'\n') else {
            continue;
        };
        let start = newline + 1;
        if let Some(record) = buf[..n].get(start..start + 40) {
            hashes.push(record.try_into().expect("40 byte slice"));
        }
    }

    hashes
}

/// A shuffled workload of `positives` corpus hashes and `negatives` random ones.
pub fn mixed_workload(corpus: &Path, positives: usize, negatives: usize) -> Vec<([u8; 40], bool)> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut work: Vec<([u8; 40], bool)> = sample_corpus_hashes(&mut rng, corpus, positives)
        .into_iter()
        .map(|h| (h, true))
        .chain(random_negative_hashes(&mut rng, negatives).into_iter().map(|h| (h, false)))
        .collect();

    work.shuffle(&mut rng);
    work
}
