//! Merkle tree with sorted leaf ordering (spec §4.2).
//!
//! Leaves are SHA-256 digests of caller-supplied bytes, sorted ascending by
//! lowercase hex before the tree is built, so the root is independent of
//! insertion order (spec property 1). Every internal node is retained by
//! level so inclusion proofs can be served without rebuilding (spec §4.2,
//! §5 "a single Merkle build ... must not block responsiveness").
//!
//! Not present in the backend teacher; the sorted-leaf/duplicate-odd-tail
//! shape is grounded on the wider pack's Merkle implementations
//! (timewave-computer-zk-merkle-proofs, GlobalSushrut-PARVYOM-metanode
//! receipts crates), built here against the exact algorithm in spec §4.2.

use data_encoding::HEXLOWER;

use crate::hashing::sha256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("no leaves to build tree")]
    EmptyTree,
    #[error("leaf index out of range")]
    OutOfRange,
}

/// A built Merkle tree. Retains every level so `proof()` is O(log n)
/// without rebuilding.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// Original-index -> sorted-position, i.e. `sorted_index[i]` is where
    /// leaf `i` (in original insertion order) landed after sorting.
    sorted_index: Vec<usize>,
    /// Levels bottom-to-top, each a vec of raw 32-byte node hashes.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree over `leaves`, where each entry is the raw bytes whose
    /// SHA-256 digest becomes a leaf hash. Leaves are sorted ascending by
    /// hex digest before pairing begins.
    pub fn build(leaves: &[Vec<u8>]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let leaf_hashes: Vec<[u8; 32]> = leaves.iter().map(|l| sha256(l)).collect();

        let mut order: Vec<usize> = (0..leaf_hashes.len()).collect();
        order.sort_by(|&a, &b| {
            HEXLOWER
                .encode(&leaf_hashes[a])
                .cmp(&HEXLOWER.encode(&leaf_hashes[b]))
        });

        // sorted_index[original_i] = position in the sorted bottom level
        let mut sorted_index = vec![0usize; leaf_hashes.len()];
        for (pos, &orig) in order.iter().enumerate() {
            sorted_index[orig] = pos;
        }

        let bottom: Vec<[u8; 32]> = order.iter().map(|&i| leaf_hashes[i]).collect();

        let mut levels = vec![bottom];
        while levels.last().unwrap().len() > 1 {
            let current = levels.last().unwrap();
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            let mut i = 0;
            while i < current.len() {
                let left = current[i];
                let right = if i + 1 < current.len() {
                    current[i + 1]
                } else {
                    current[i]
                };
                let mut combined = Vec::with_capacity(64);
                combined.extend_from_slice(&left);
                combined.extend_from_slice(&right);
                next.push(sha256(&combined));
                i += 2;
            }
            levels.push(next);
        }

        Ok(MerkleTree {
            sorted_index,
            levels,
        })
    }

    pub fn root(&self) -> String {
        let top = self.levels.last().expect("build() guarantees >=1 level");
        HEXLOWER.encode(&top[0])
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Inclusion proof for the leaf originally inserted at `leaf_index`.
    pub fn proof(&self, leaf_index: usize) -> Result<Vec<String>, MerkleError> {
        if leaf_index >= self.sorted_index.len() {
            return Err(MerkleError::OutOfRange);
        }

        let mut pos = self.sorted_index[leaf_index];
        let mut proof = Vec::new();

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = pos ^ 1;
            let sibling_hash = if sibling < level.len() {
                level[sibling]
            } else {
                level[pos]
            };
            proof.push(HEXLOWER.encode(&sibling_hash));
            pos /= 2;
        }

        Ok(proof)
    }
}

/// Verify that `leaf_bytes` is included under `root_hex` given `proof`.
/// Returns `false` (never an error) on malformed hex or length mismatch,
/// per spec §4.2.
pub fn verify(leaf_bytes: &[u8], proof: &[String], root_hex: &str) -> bool {
    let mut current = sha256(leaf_bytes);

    for sibling_hex in proof {
        let sibling = match HEXLOWER.decode(sibling_hex.as_bytes()) {
            Ok(b) if b.len() == 32 => b,
            _ => return false,
        };
        let current_hex = HEXLOWER.encode(&current);
        let mut combined = Vec::with_capacity(64);
        if current_hex.as_str() < sibling_hex.as_str() {
            combined.extend_from_slice(&current);
            combined.extend_from_slice(&sibling);
        } else {
            combined.extend_from_slice(&sibling);
            combined.extend_from_slice(&current);
        }
        current = sha256(&combined);
    }

    HEXLOWER.encode(&current) == root_hex
}
