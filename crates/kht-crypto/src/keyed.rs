//! Keyed hash capability: key bytes → streaming hasher → fixed-length digest

use std::marker::PhantomData;

use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::{Digest, KeyInit};
use hmac::{Mac, SimpleHmac};

use kht_core::{KhtError, KhtResult};

/// A hash algorithm which depends on a secret key (e.g. HMAC).
///
/// Implementations must be stateless across calls: every tree level of every
/// derivation asks for its own hasher.
pub trait KeyedHash: Send + Sync {
    type Hasher: KeyedHasher;

    /// Create a fresh hasher keyed by `key`.
    fn keyed(&self, key: &[u8]) -> KhtResult<Self::Hasher>;

    /// Digest length in bytes.
    fn output_size(&self) -> usize;
}

/// A single-use keyed hash state.
pub trait KeyedHasher {
    fn write(&mut self, data: &[u8]);

    fn finish(self) -> Vec<u8>;
}

/// HMAC over any RustCrypto digest.
pub struct Hmac<D> {
    _digest: PhantomData<fn() -> D>,
}

pub type HmacMd5 = Hmac<md5::Md5>;
pub type HmacSha256 = Hmac<sha2::Sha256>;
pub type HmacSha512 = Hmac<sha2::Sha512>;

impl<D> Hmac<D> {
    pub const fn new() -> Self {
        Self {
            _digest: PhantomData,
        }
    }
}

impl<D> Default for Hmac<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Hmac<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Hmac<D> {}

impl<D> std::fmt::Debug for Hmac<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hmac")
            .field("digest", &std::any::type_name::<D>())
            .finish()
    }
}

/// Hasher state produced by [`Hmac`].
pub struct HmacHasher<D: Digest + BlockSizeUser> {
    mac: SimpleHmac<D>,
}

impl<D> KeyedHash for Hmac<D>
where
    D: Digest + BlockSizeUser + Clone,
{
    type Hasher = HmacHasher<D>;

    fn keyed(&self, key: &[u8]) -> KhtResult<Self::Hasher> {
        let mac = <SimpleHmac<D> as KeyInit>::new_from_slice(key)
            .map_err(|e| KhtError::KeyedHash(format!("HMAC key rejected: {e}")))?;
        Ok(HmacHasher { mac })
    }

    fn output_size(&self) -> usize {
        <D as Digest>::output_size()
    }
}

impl<D> KeyedHasher for HmacHasher<D>
where
    D: Digest + BlockSizeUser + Clone,
{
    fn write(&mut self, data: &[u8]) {
        Mac::update(&mut self.mac, data);
    }

    fn finish(self) -> Vec<u8> {
        Mac::finalize(self.mac).into_bytes().to_vec()
    }
}
