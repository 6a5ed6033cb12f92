//! Offline password breach checking against the Pwned Passwords SHA-1 corpus.
//!
//! The corpus is the "ordered by hash" text download: one record per line,
//! `<40 uppercase hex chars>:<count>`, sorted by hash. It is tens of gigabytes, so
//! rather than loading or indexing it this crate memory-maps the file and binary
//! searches it in place (see [`search`]).
//!
//! Most passwords people check are not in the corpus, and each of those would
//! cost ~30 page faults on a cold cache. An optional 512 MiB [`BloomFilter`]
//! built from the same corpus rejects about 96.5% of them with 5 memory reads.
//!
//! ```no_run
//! use pwned_offline::{Checker, Scope};
//!
//! let mut checker = Checker::new("data")?;
//! let mut checker = checker.scoped()?;
//! assert!(checker.lookup_raw_password("password123")?);
//! # Ok::<(), pwned_offline::Error>(())
//! ```

use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

pub mod bloom;
pub mod checker;
mod error;
pub mod mapped;
pub mod scope;
pub mod search;

pub use bloom::BloomFilter;
pub use checker::{BloomPolicy, Checker};
pub use error::{Error, Result};
pub use mapped::{Access, MappedFile};
pub use scope::{Scope, Scoped};

/// Environment variable name for specifying the dataset directory or corpus file.
pub const DATA_PATH_ENV: &str = "PWNED_PASSWORDS_DATA";

/// File looked up when a directory is given as the corpus path.
pub const DEFAULT_DATA_FILE_NAME: &str = "pwned-passwords-sha1-ordered-by-hash-v7.txt";

/// File probed next to the corpus by [`BloomPolicy::Automatic`].
pub const DEFAULT_BLOOM_FILE_NAME: &str = "pwned-passwords-sha1-ordered-by-hash-v7.bloom";

/// Hex lookup table for digest conversion.
pub const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

/// Returns the dataset path from the PWNED_PASSWORDS_DATA environment variable,
/// or falls back to a `data` directory next to this crate.
pub fn dataset_path_from_env() -> PathBuf {
    std::env::var_os(DATA_PATH_ENV).map(PathBuf::from).unwrap_or_else(|| {
        Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap_or(Path::new(".")).join("data")
    })
}

/// SHA-1 of `bytes` as uppercase hex, the form the corpus stores.
#[inline]
pub fn sha1_hex(bytes: &[u8]) -> [u8; 40] {
    let digest: [u8; 20] = Sha1::digest(bytes).into();

    let mut hex = [0u8; 40];
    for (pair, byte) in hex.chunks_exact_mut(2).zip(digest) {
        pair[0] = HEX_CHARS[(byte >> 4) as usize];
        pair[1] = HEX_CHARS[(byte & 0x0f) as usize];
    }
    hex
}
