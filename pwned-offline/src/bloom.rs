//! Fixed-parameter bloom filter over a memory-mapped file.
//!
//! The parameters are not configurable:
//!
//! - 2^32 bits, stored in a 512 MiB file with no header
//! - 5 lanes of 32 bits each, sliced from a single SHA-1 digest of the value
//!
//! For ~6x10^8 corpus entries this gives a false positive rate of about 3.47%
//! (1 in 29), so the overwhelming majority of passwords that are not in the
//! corpus never reach the binary search.
//!
//! # File format
//!
//! Lane `i` is digest bytes `4i..4i + 4` read as a **little-endian** `u32`. Lane
//! value `h` addresses bit `h & 7` of byte `h >> 3`. Populator and reader must
//! agree on this, since the file carries no metadata.

use std::path::Path;

use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::mapped::{Access, MappedFile};
use crate::scope::Scope;

/// Number of addressable bits.
pub const SIZE_BITS: u64 = 1 << 32;

/// Exact size of a filter file in bytes (512 MiB).
pub const SIZE_BYTES: u64 = SIZE_BITS / 8;

/// Number of bits set per value.
pub const NUM_LANES: usize = 5;

const LANE_BYTES: usize = 4;

const _: () = assert!(NUM_LANES * LANE_BYTES == 20, "lanes must cover the SHA-1 digest");

/// (byte index, bit mask) pair for one lane.
pub type BitAddress = (usize, u8);

/// Computes the bit addresses for `value`.
#[inline]
pub fn bit_addresses(value: &[u8]) -> [BitAddress; NUM_LANES] {
    let digest: [u8; 20] = Sha1::digest(value).into();
    bit_addresses_from_digest(&digest)
}

/// Slices a SHA-1 digest into its lane addresses.
#[inline]
pub fn bit_addresses_from_digest(digest: &[u8; 20]) -> [BitAddress; NUM_LANES] {
    let mut addresses = [(0usize, 0u8); NUM_LANES];
    for (address, lane) in addresses.iter_mut().zip(digest.chunks_exact(LANE_BYTES)) {
        let h = u32::from_le_bytes([lane[0], lane[1], lane[2], lane[3]]);
        *address = ((h >> 3) as usize, 1 << (h & 0x7));
    }
    addresses
}

/// Bloom filter with the fixed parameters described in the module docs.
///
/// Opened read-only for queries, or read-write while populating from the corpus.
pub struct BloomFilter {
    file: MappedFile,
}

impl BloomFilter {
    /// Opens (or creates) `path` for population. The file is sized to
    /// [`SIZE_BYTES`] on open; a new file starts with every bit clear.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let access = Access::ReadWrite { fixed_size: Some(SIZE_BYTES) };
        Ok(Self { file: MappedFile::resolve(path, None, access)? })
    }

    /// Prepares `path` for queries. Fails if the file is missing, is not a
    /// regular file, or is not exactly [`SIZE_BYTES`] long.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let file = MappedFile::resolve(path, None, Access::ReadOnly)?;
        let metadata =
            std::fs::metadata(file.path()).map_err(|e| Error::from_open(file.path(), e))?;
        check_size(file.path(), metadata.len())?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn is_read_only(&self) -> bool {
        self.file.access() == Access::ReadOnly
    }

    /// Sets the bits for `value`.
    pub fn add(&mut self, value: &[u8]) -> Result<()> {
        let data = self.file.data_mut()?;
        for (index, mask) in bit_addresses(value) {
            data[index] |= mask;
        }
        Ok(())
    }

    /// Returns `false` if `value` was definitely never added. `true` means it
    /// probably was.
    pub fn contains(&self, value: &[u8]) -> Result<bool> {
        let data = self.file.data()?;
        Ok(bit_addresses(value).iter().all(|&(index, mask)| data[index] & mask != 0))
    }
}

fn check_size(path: &Path, len: u64) -> Result<()> {
    if len != SIZE_BYTES {
        return Err(Error::InvalidArgument(format!(
            "bloom filter '{}' is {len} bytes, expected {SIZE_BYTES}",
            path.display()
        )));
    }
    Ok(())
}

impl Scope for BloomFilter {
    fn open(&mut self) -> Result<()> {
        self.file.open()?;
        // The file may have been swapped since construction; indexing relies on the size.
        let len = self.file.data()?.len() as u64;
        if let Err(e) = check_size(self.file.path(), len) {
            self.file.close();
            return Err(e);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.file.close();
    }

    fn is_open(&self) -> bool {
        self.file.is_open()
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_lanes_are_little_endian_digest_chunks() {
        // SHA1("1") = 356A192B7913B04C54574D18C28D46E6395428AB
        let digest = hex!("356a192b7913b04c54574d18c28d46e6395428ab");
        let expected: [BitAddress; NUM_LANES] = [
            (0x0563_2d46, 32),
            (0x0996_026f, 2),
            (0x0309_aaea, 16),
            (0x1cc8_d1b8, 4),
            (0x1565_0a87, 2),
        ];

        assert_eq!(bit_addresses_from_digest(&digest), expected);
        assert_eq!(bit_addresses(b"1"), expected);
    }

    #[test]
    fn test_addresses_stay_inside_the_file() {
        let (index, mask) = bit_addresses_from_digest(&[0xFF; 20])[0];
        assert_eq!(index as u64, SIZE_BYTES - 1);
        assert_eq!(mask, 0x80);

        let (index, mask) = bit_addresses_from_digest(&[0x00; 20])[0];
        assert_eq!(index, 0);
        assert_eq!(mask, 0x01);
    }

    #[test]
    fn test_add_then_contains() {
        let dir = tempfile::tempdir().unwrap();
        let mut bloom = BloomFilter::create(dir.path().join("test.bloom")).unwrap();
        let mut bloom = bloom.scoped().unwrap();

        bloom.add(b"1").unwrap();
        bloom.add(b"2").unwrap();

        assert!(bloom.contains(b"1").unwrap());
        assert!(bloom.contains(b"2").unwrap());
        assert!(!bloom.contains(b"3").unwrap());
    }

    #[test]
    fn test_read_only_filter_rejects_add() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.bloom");
        {
            let mut bloom = BloomFilter::create(&path).unwrap();
            bloom.scoped().unwrap().add(b"value").unwrap();
        }

        let mut bloom = BloomFilter::open_read_only(&path).unwrap();
        assert!(bloom.is_read_only());
        let mut bloom = bloom.scoped().unwrap();
        assert!(bloom.contains(b"value").unwrap());
        assert!(matches!(bloom.add(b"other"), Err(Error::PermissionDenied { .. })));
    }

    #[test]
    fn test_closed_filter_is_not_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let bloom = BloomFilter::create(dir.path().join("test.bloom")).unwrap();
        assert!(matches!(bloom.contains(b"1"), Err(Error::NotOpen { .. })));
    }

    #[test]
    fn test_open_read_only_rejects_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bloom");
        std::fs::write(&path, [0u8; 1024]).unwrap();

        let err = BloomFilter::open_read_only(&path);
        assert!(matches!(err, Err(Error::InvalidArgument(_))));

        let err = BloomFilter::open_read_only(dir.path().join("missing.bloom"));
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }
}
