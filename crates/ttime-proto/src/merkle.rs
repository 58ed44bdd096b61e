// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! SHA-512 Merkle tree over a batch of request nonces.
//!
//! - `leaf = SHA-512(0x00 || nonce)`
//! - `node = SHA-512(0x01 || left || right)`
//!
//! Every level is padded to an even width with an all-zero placeholder node,
//! and the root is the single meaningful node of the top level. A batch of
//! one nonce has the leaf hash as its root and an empty path.

use ring::digest;

use crate::error::{RoughtimeError, WireFormatError};
use crate::tag::Tag;
use crate::types::Nonce;

/// Size of a tree node.
pub const HASH_SIZE: usize = 64;

/// A tree node.
pub type Hash = [u8; HASH_SIZE];

const LEAF_TWEAK: u8 = 0x00;
const NODE_TWEAK: u8 = 0x01;

/// Hash a nonce into a leaf.
pub fn hash_leaf(nonce: &[u8]) -> Hash {
    let mut ctx = digest::Context::new(&digest::SHA512);
    ctx.update(&[LEAF_TWEAK]);
    ctx.update(nonce);
    finish(ctx)
}

/// Hash two children into their parent.
pub fn hash_node(left: &[u8], right: &[u8]) -> Hash {
    let mut ctx = digest::Context::new(&digest::SHA512);
    ctx.update(&[NODE_TWEAK]);
    ctx.update(left);
    ctx.update(right);
    finish(ctx)
}

fn finish(ctx: digest::Context) -> Hash {
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

/// A Merkle tree built once over a non-empty batch of nonces.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
    leaves: usize,
}

impl MerkleTree {
    /// Build a tree. Returns `None` for an empty batch.
    pub fn new(nonces: &[Nonce]) -> Option<MerkleTree> {
        if nonces.is_empty() {
            return None;
        }

        let mut num_levels = 1;
        let mut width = nonces.len();
        while width > 1 {
            width = width.div_ceil(2);
            num_levels += 1;
        }

        let mut levels = Vec::with_capacity(num_levels);
        let mut leaves: Vec<Hash> = nonces.iter().map(|n| hash_leaf(n)).collect();
        pad_even(&mut leaves);
        levels.push(leaves);

        for _ in 1..num_levels {
            let below = &levels[levels.len() - 1];
            let mut level: Vec<Hash> = below
                .chunks_exact(2)
                .map(|pair| hash_node(&pair[0], &pair[1]))
                .collect();
            pad_even(&mut level);
            levels.push(level);
        }

        Some(MerkleTree {
            levels,
            leaves: nonces.len(),
        })
    }

    /// The root node.
    pub fn root(&self) -> Hash {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of levels, including the leaf level and the root level.
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of nonces the tree was built over.
    pub fn len(&self) -> usize {
        self.leaves
    }

    /// Always false; a tree holds at least one nonce.
    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Sibling nodes from the leaf at `index` up to (not including) the root.
    pub fn path(&self, index: usize) -> Option<Vec<Hash>> {
        if index >= self.leaves {
            return None;
        }
        let mut index = index;
        let mut path = Vec::with_capacity(self.levels.len() - 1);
        for level in &self.levels[..self.levels.len() - 1] {
            path.push(level[index ^ 1]);
            index /= 2;
        }
        Some(path)
    }
}

fn pad_even(level: &mut Vec<Hash>) {
    if level.len() % 2 == 1 {
        level.push([0u8; HASH_SIZE]);
    }
}

/// Recompute a root from a leaf, its index, and a wire-format PATH value.
pub fn root_from_path(leaf: &Hash, index: u32, path: &[u8]) -> Result<Hash, WireFormatError> {
    if path.len() % HASH_SIZE != 0 {
        return Err(WireFormatError::InvalidLength {
            tag: Tag::PATH,
            expected: HASH_SIZE,
            actual: path.len(),
        });
    }

    let mut index = index;
    let mut current = *leaf;
    for sibling in path.chunks_exact(HASH_SIZE) {
        current = if index & 1 == 0 {
            hash_node(&current, sibling)
        } else {
            hash_node(sibling, &current)
        };
        index >>= 1;
    }
    Ok(current)
}

/// Check that `nonce` sits at `index` under `root`.
pub fn verify_inclusion(
    nonce: &[u8],
    index: u32,
    path: &[u8],
    root: &[u8],
) -> Result<(), RoughtimeError> {
    let computed = root_from_path(&hash_leaf(nonce), index, path)?;
    // Index bits above the path depth would name a leaf outside the tree.
    let depth = u32::try_from(path.len() / HASH_SIZE).unwrap_or(u32::MAX);
    if index.checked_shr(depth).unwrap_or(0) != 0 {
        return Err(RoughtimeError::TreeMismatch);
    }
    if computed[..] != *root {
        return Err(RoughtimeError::TreeMismatch);
    }
    Ok(())
}
