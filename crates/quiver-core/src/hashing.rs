//! SHA-256 hashing helpers (spec §4.1). Grounded on the teacher's
//! `crypto::hashing` shape (a thin wrapper producing lowercase hex), with
//! `Sha3_512` swapped for `Sha256` since the spec pins SHA-256 for
//! prompt/output/chain hashes.

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};

/// Raw 32-byte SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

/// Lowercase-hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    HEXLOWER.encode(&sha256(data))
}
