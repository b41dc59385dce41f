//! Content fingerprints for receipt deduplication.
//!
//! The fingerprint is a digest over the raw bytes, computed before any
//! parsing, so two visually different renders of the same file still
//! collide and a one-byte edit does not.

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Digest the raw receipt bytes into `"sha256:<hex>"`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity("sha256:".len() + digest.len() * 2);
    out.push_str("sha256:");
    for byte in digest {
        // Writing into a String cannot fail.
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
