#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use pwned_offline::{DEFAULT_DATA_FILE_NAME, sha1_hex};

/// Pads `prefix` with zeros to a full 40-character hash.
pub fn padded(prefix: &str) -> String {
    format!("{prefix:0<40}")
}

/// Sorted uppercase hashes of the decimal strings `0..n`.
pub fn generated_hashes(n: u32) -> Vec<String> {
    let mut hashes: Vec<String> = (0..n)
        .map(|i| String::from_utf8(sha1_hex(i.to_string().as_bytes()).to_vec()).unwrap())
        .collect();
    hashes.sort();
    hashes
}

/// Writes `hashes` in the download format (`HASH:count\r\n`) to the default
/// corpus file name inside `dir`.
pub fn write_corpus(dir: &Path, hashes: &[String]) -> PathBuf {
    let path = dir.join(DEFAULT_DATA_FILE_NAME);
    let mut contents = String::new();
    for (i, hash) in hashes.iter().enumerate() {
        contents.push_str(&format!("{hash}:{}\r\n", i % 9000 + 1));
    }
    fs::write(&path, contents).unwrap();
    path
}
