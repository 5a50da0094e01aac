//! Keyed hash tree: depth computation and root → leaf key derivation
//!
//! Each level hashes a 16-byte index buffer with a key equal to the previous
//! level's output:
//! ```text
//! buf   = step (u64 LE) || node_index_at_level (u64 LE)
//! k_0   = root
//! k_i+1 = KeyedHash(k_i)(buf_i)
//! ```
//! Only the root is stored. Every call to [`KeyedHashTree::derive_key`]
//! re-walks the tree from the root.

use std::ops::Range;

use rayon::prelude::*;
use zeroize::Zeroizing;

use kht_core::{KhtError, KhtResult, TreeConfig};

use crate::keyed::{KeyedHash, KeyedHasher};
use crate::keys::{DerivedKey, RootKey};
use crate::INDEX_SIZE;

/// Deepest tree accepted. Only factors within ~1e-8 of 1 over large spaces
/// come near it; such walks would never finish in practice.
pub const MAX_DEPTH: u64 = u32::MAX as u64;

/// A tree of keyed hashes, used to derive per-block keys.
pub struct KeyedHashTree<H> {
    root: RootKey,
    keyed_hash: H,
    block_size: u64,
    max_size: u64,
    factor: f64,
    depth: u64,
}

/// A derived key together with the block it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockKey {
    /// Leaf block index (`offset / block_size`)
    pub index: u64,
    /// First byte offset of the block
    pub offset: u64,
    pub key: DerivedKey,
}

impl<H: KeyedHash> KeyedHashTree<H> {
    /// Build a tree with the given root key, keyed hash, block size, maximum
    /// size and branching factor.
    ///
    /// Fails with [`KhtError::InvalidParameters`] when the shape has no finite,
    /// non-negative depth or the root key is empty. No hashing happens here.
    pub fn new(
        root: RootKey,
        keyed_hash: H,
        block_size: u64,
        max_size: u64,
        factor: f64,
    ) -> KhtResult<Self> {
        if root.is_empty() {
            return Err(KhtError::InvalidParameters(
                "root key must not be empty".into(),
            ));
        }
        let depth = tree_depth(block_size, max_size, factor)?;

        tracing::debug!(
            block_size,
            max_size,
            factor,
            depth,
            "keyed hash tree configured"
        );

        Ok(Self {
            root,
            keyed_hash,
            block_size,
            max_size,
            factor,
            depth,
        })
    }

    /// Build a tree from the `[tree]` config section.
    ///
    /// `config.hash` is informational here; the caller picks `H`.
    pub fn from_config(root: RootKey, keyed_hash: H, config: &TreeConfig) -> KhtResult<Self> {
        Self::new(
            root,
            keyed_hash,
            config.block_size,
            config.max_size,
            config.factor,
        )
    }

    /// Derive the key of the block containing `offset`.
    ///
    /// `offset` may equal `max_size`. Anything larger fails with
    /// [`KhtError::OffsetOutOfRange`] before any hashing is done.
    pub fn derive_key(&self, offset: u64) -> KhtResult<DerivedKey> {
        self.check_offset(offset)?;

        let mut buf = [0u8; INDEX_SIZE];
        let mut key = Zeroizing::new(self.root.as_bytes().to_vec());
        for i in 0..self.depth {
            let level = self.depth - i;
            let y = offset / self.level_block_size(level);

            buf[..8].copy_from_slice(&i.to_le_bytes());
            buf[8..].copy_from_slice(&y.to_le_bytes());

            let mut hasher = self.keyed_hash.keyed(&key)?;
            hasher.write(&buf);
            key = Zeroizing::new(hasher.finish());
        }

        tracing::trace!(offset, depth = self.depth, "derived block key");
        Ok(DerivedKey::from_bytes(std::mem::take(&mut *key)))
    }

    /// Derive the keys of every block touched by `range` (end-exclusive), in
    /// block order. Blocks are derived in parallel.
    pub fn derive_range(&self, range: Range<u64>) -> KhtResult<Vec<BlockKey>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        self.check_offset(range.end - 1)?;

        let first = range.start / self.block_size;
        let last = (range.end - 1) / self.block_size;
        self.derive_indexes(first, last)
    }

    /// Derive the keys of up to `count` consecutive blocks starting at block
    /// `first`, stopping after the block that holds `max_size`.
    pub fn derive_blocks(&self, first: u64, count: u64) -> KhtResult<Vec<BlockKey>> {
        let last_index = self.last_block_index();
        if first > last_index {
            return Err(KhtError::OffsetOutOfRange {
                offset: first.saturating_mul(self.block_size),
                max_size: self.max_size,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let last = first.saturating_add(count - 1).min(last_index);
        self.derive_indexes(first, last)
    }

    fn derive_indexes(&self, first: u64, last: u64) -> KhtResult<Vec<BlockKey>> {
        (first..=last)
            .into_par_iter()
            .map(|index| {
                let offset = index * self.block_size;
                self.derive_key(offset)
                    .map(|key| BlockKey { index, offset, key })
            })
            .collect()
    }

    /// Leaf block index of `offset`.
    pub fn block_index(&self, offset: u64) -> KhtResult<u64> {
        self.check_offset(offset)?;
        Ok(offset / self.block_size)
    }

    /// Number of leaf blocks covering `[0, max_size]`, saturating at `u64::MAX`.
    pub fn block_count(&self) -> u64 {
        self.last_block_index().saturating_add(1)
    }

    /// Index of the block holding `max_size`.
    pub fn last_block_index(&self) -> u64 {
        self.max_size / self.block_size
    }

    pub fn depth(&self) -> u64 {
        self.depth
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn keyed_hash(&self) -> &H {
        &self.keyed_hash
    }

    /// Length of keys produced by [`derive_key`](Self::derive_key).
    pub fn key_len(&self) -> usize {
        if self.depth == 0 {
            self.root.len()
        } else {
            self.keyed_hash.output_size()
        }
    }

    fn check_offset(&self, offset: u64) -> KhtResult<()> {
        if offset > self.max_size {
            return Err(KhtError::OffsetOutOfRange {
                offset,
                max_size: self.max_size,
            });
        }
        Ok(())
    }

    /// Bytes covered by one node at `level` (1 = leaf).
    ///
    /// The power is truncated to an integer before scaling by `block_size`;
    /// keys already derived with non-integer factors depend on this.
    fn level_block_size(&self, level: u64) -> u64 {
        let scale = self.factor.powf((level - 1) as f64) as u64;
        scale.saturating_mul(self.block_size)
    }
}

impl<H> std::fmt::Debug for KeyedHashTree<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedHashTree")
            .field("root", &self.root)
            .field("block_size", &self.block_size)
            .field("max_size", &self.max_size)
            .field("factor", &self.factor)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Number of derivation steps from root to leaf:
/// `ceil(ln(max_size / block_size) / ln(factor))`, computed in f64.
pub fn tree_depth(block_size: u64, max_size: u64, factor: f64) -> KhtResult<u64> {
    if block_size == 0 {
        return Err(KhtError::InvalidParameters(
            "block size must be positive".into(),
        ));
    }
    if max_size < block_size {
        return Err(KhtError::InvalidParameters(format!(
            "maximum size {max_size} is smaller than block size {block_size}"
        )));
    }
    if !factor.is_finite() || factor <= 1.0 {
        return Err(KhtError::InvalidParameters(format!(
            "branching factor must be a finite number greater than 1, got {factor}"
        )));
    }

    let depth = ((max_size as f64 / block_size as f64).ln() / factor.ln()).ceil();
    if depth > MAX_DEPTH as f64 {
        return Err(KhtError::InvalidParameters(format!(
            "branching factor {factor} needs {depth} levels (max {MAX_DEPTH})"
        )));
    }
    Ok(depth as u64)
}
