use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bloom::BloomFilter;
use crate::error::{Error, Result};
use crate::mapped::{Access, MappedFile};
use crate::scope::Scope;
use crate::search::{self, HASH_LEN};
use crate::{DEFAULT_BLOOM_FILE_NAME, DEFAULT_DATA_FILE_NAME, sha1_hex};

/// Which bloom filter, if any, a [`Checker`] consults before searching the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BloomPolicy {
    /// Use [`DEFAULT_BLOOM_FILE_NAME`] next to the corpus when it exists and is
    /// valid, otherwise run without a filter.
    #[default]
    Automatic,
    Disabled,
    /// Use this filter; failing to open it is an error.
    Path(PathBuf),
}

/// Checks hashes and passwords against the sorted Pwned Passwords corpus.
///
/// The corpus (and the bloom filter, when one is attached) is mapped while the
/// checker is open. Opening is reentrant, see [`Scope`]. Lookups on a closed
/// checker open it for the duration of that one call, which is convenient but
/// pays for an mmap/munmap each time, so hold a [`Scope::scoped`] guard when
/// checking many values.
pub struct Checker {
    corpus: MappedFile,
    bloom: Option<BloomFilter>,
}

impl Checker {
    /// Creates a checker for `data_path` with [`BloomPolicy::Automatic`].
    ///
    /// `data_path` is the corpus file itself, or a directory containing
    /// [`DEFAULT_DATA_FILE_NAME`].
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_bloom(data_path, BloomPolicy::Automatic)
    }

    pub fn with_bloom(data_path: impl AsRef<Path>, policy: BloomPolicy) -> Result<Self> {
        let corpus =
            MappedFile::resolve(data_path, Some(DEFAULT_DATA_FILE_NAME), Access::ReadOnly)?;

        let bloom = match policy {
            BloomPolicy::Disabled => None,
            BloomPolicy::Path(path) => Some(BloomFilter::open_read_only(path)?),
            BloomPolicy::Automatic => discover_bloom(corpus.path())?,
        };

        Ok(Self { corpus, bloom })
    }

    pub fn corpus_path(&self) -> &Path {
        self.corpus.path()
    }

    /// Path of the attached bloom filter, if any.
    pub fn bloom_path(&self) -> Option<&Path> {
        self.bloom.as_ref().map(BloomFilter::path)
    }

    /// Returns whether the SHA-1 `hash` appears in the corpus.
    ///
    /// `hash` is hex in either case; only its first 40 characters are used.
    /// Shorter input, or non-hex characters, is [`Error::InvalidArgument`].
    pub fn lookup_hash(&mut self, hash: impl AsRef<[u8]>) -> Result<bool> {
        let target = normalize_hash(hash.as_ref())?;

        if self.is_open() {
            return self.lookup_normalized(&target);
        }

        let checker = self.scoped()?;
        checker.lookup_normalized(&target)
    }

    /// Returns whether `password`, encoded as UTF-8, appears in the corpus.
    pub fn lookup_raw_password(&mut self, password: &str) -> Result<bool> {
        self.lookup_raw_password_bytes(password.as_bytes())
    }

    /// Like [`lookup_raw_password`](Self::lookup_raw_password) for a password
    /// the caller has already encoded.
    pub fn lookup_raw_password_bytes(&mut self, password: &[u8]) -> Result<bool> {
        self.lookup_hash(sha1_hex(password))
    }

    fn lookup_normalized(&self, target: &[u8; HASH_LEN]) -> Result<bool> {
        // A miss in the filter is definitive; a hit may be a false positive.
        if let Some(bloom) = &self.bloom
            && !bloom.contains(target)?
        {
            return Ok(false);
        }

        Ok(search::contains_hash(self.corpus.data()?, target))
    }
}

impl Scope for Checker {
    fn open(&mut self) -> Result<()> {
        self.corpus.open()?;
        if let Some(bloom) = &mut self.bloom
            && let Err(e) = bloom.open()
        {
            self.corpus.close();
            return Err(e);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.corpus.close();
        if let Some(bloom) = &mut self.bloom {
            bloom.close();
        }
    }

    fn is_open(&self) -> bool {
        self.corpus.is_open()
    }
}

/// Looks for the conventional filter next to the corpus. A missing or malformed
/// filter only costs speed, so those cases fall back to no filter.
fn discover_bloom(corpus_path: &Path) -> Result<Option<BloomFilter>> {
    let candidate =
        corpus_path.parent().unwrap_or_else(|| Path::new(".")).join(DEFAULT_BLOOM_FILE_NAME);

    match BloomFilter::open_read_only(&candidate) {
        Ok(bloom) => {
            debug!(path = %candidate.display(), "using bloom filter");
            Ok(Some(bloom))
        }
        Err(e @ (Error::NotFound { .. } | Error::InvalidArgument(_))) => {
            debug!(path = %candidate.display(), reason = %e, "continuing without bloom filter");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Uppercases the first 40 bytes of `hash`, rejecting anything that is not hex.
fn normalize_hash(hash: &[u8]) -> Result<[u8; HASH_LEN]> {
    let Some(prefix) = hash.get(..HASH_LEN) else {
        return Err(Error::InvalidArgument(format!(
            "hash must be {HASH_LEN} hex characters, got {}",
            hash.len()
        )));
    };

    let mut target = [0u8; HASH_LEN];
    for (out, &c) in target.iter_mut().zip(prefix) {
        if !c.is_ascii_hexdigit() {
            return Err(Error::InvalidArgument(format!(
                "hash contains non-hex character '{}'",
                c.escape_ascii()
            )));
        }
        *out = c.to_ascii_uppercase();
    }
    Ok(target)
}
