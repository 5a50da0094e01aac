//! kht-crypto: block-level key derivation with a keyed hash tree
//!
//! A keyed hash tree derives one key per fixed-size block of a (very large)
//! address space from a single root key. Nodes are never materialized: each
//! derivation walks root → leaf, keying a hash with the parent's value.
//!
//! With a branching factor of 2 the tree has log2(max_size / block_size) levels:
//! ```text
//! +-----------------------------------------------------------------------+
//! |                                K(0,0)                                 |
//! +-----------------------------------+-----------------------------------+
//! |              K(1,0)               |              K(1,1)               |
//! +-----------------+-----------------+-----------------+-----------------+
//! |      K(2,0)     |     K(2,1)      |     K(2,2)      |     K(2,3)      |
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! | K(3,0) | K(3,1) | K(3,2) | K(3,3) | K(3,4) | K(3,5) | K(3,6) | K(3,7) |
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! ```
//!
//! Key hierarchy as used for file encryption:
//! ```text
//! Master Key (256-bit)
//!   └── File Root Key (HKDF-SHA256, info="kht-file-root" || file_id)
//!       └── Block Key (keyed hash tree walk, one per block_size bytes)
//! ```

pub mod keyed;
pub mod keys;
pub mod tree;

pub use keyed::{Hmac, HmacMd5, HmacSha256, HmacSha512, KeyedHash, KeyedHasher};
pub use keys::{derive_file_root_key, generate_root_key, DerivedKey, RootKey};
pub use tree::{tree_depth, BlockKey, KeyedHashTree, MAX_DEPTH};

pub use kht_core::{KhtError, KhtResult};

/// Size of a generated root key in bytes (256-bit)
pub const ROOT_KEY_SIZE: usize = 32;

/// Size of the index buffer hashed at each level: step (u64 LE) || node index (u64 LE)
pub const INDEX_SIZE: usize = 16;
