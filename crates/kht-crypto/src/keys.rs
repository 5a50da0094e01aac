//! Key material: root keys, derived block keys, root key generation

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use kht_core::{KhtError, KhtResult};

use crate::ROOT_KEY_SIZE;

/// The secret at the root of a keyed hash tree. Zeroized on drop.
#[derive(Clone)]
pub struct RootKey {
    bytes: Vec<u8>,
}

impl RootKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Decode a root key from a hex string.
    pub fn from_hex(s: &str) -> KhtResult<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| KhtError::InvalidParameters(format!("root key is not valid hex: {e}")))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl Drop for RootKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A key derived for one block. Zeroized on drop.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: Vec<u8>,
}

impl DerivedKey {
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for DerivedKey {}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit root key.
pub fn generate_root_key() -> RootKey {
    let mut bytes = vec![0u8; ROOT_KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    RootKey::from_bytes(bytes)
}

/// Derive the root key for one file's tree from a master key via HKDF-SHA256.
///
/// info = "kht-file-root" || file_id
pub fn derive_file_root_key(master: &[u8; ROOT_KEY_SIZE], file_id: &[u8]) -> KhtResult<RootKey> {
    let hkdf = Hkdf::<Sha256>::new(None, master);

    let mut info = Vec::with_capacity(FILE_ROOT_DOMAIN.len() + file_id.len());
    info.extend_from_slice(FILE_ROOT_DOMAIN);
    info.extend_from_slice(file_id);

    let mut okm = vec![0u8; ROOT_KEY_SIZE];
    hkdf.expand(&info, &mut okm)
        .map_err(|e| KhtError::KeyedHash(format!("HKDF expand failed: {e}")))?;
    Ok(RootKey::from_bytes(okm))
}

const FILE_ROOT_DOMAIN: &[u8] = b"kht-file-root";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key_generation() {
        let k1 = generate_root_key();
        let k2 = generate_root_key();
        assert_eq!(k1.len(), ROOT_KEY_SIZE);
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_root_key_hex_roundtrip() {
        let key = RootKey::from_hex("796179").unwrap();
        assert_eq!(key.as_bytes(), b"yay");
        assert_eq!(key.to_hex(), "796179");
    }

    #[test]
    fn test_root_key_bad_hex() {
        let result = RootKey::from_hex("not hex");
        assert!(matches!(result, Err(KhtError::InvalidParameters(_))));
    }

    #[test]
    fn test_debug_is_redacted() {
        let root = RootKey::from_slice(b"super secret");
        let rendered = format!("{root:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("super secret"));

        let derived = DerivedKey::from_bytes(vec![0xAB; 16]);
        assert!(!format!("{derived:?}").contains("ab"));
    }

    #[test]
    fn test_file_root_key_deterministic() {
        let master = [42u8; ROOT_KEY_SIZE];
        let a = derive_file_root_key(&master, b"file-a").unwrap();
        let again = derive_file_root_key(&master, b"file-a").unwrap();
        assert_eq!(a.as_bytes(), again.as_bytes());
        assert_eq!(a.len(), ROOT_KEY_SIZE);
    }

    #[test]
    fn test_file_root_key_per_file() {
        let master = [42u8; ROOT_KEY_SIZE];
        let a = derive_file_root_key(&master, b"file-a").unwrap();
        let b = derive_file_root_key(&master, b"file-b").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes(), "different files must get different roots");
    }

    #[test]
    fn test_file_root_key_per_master() {
        let a = derive_file_root_key(&[1u8; ROOT_KEY_SIZE], b"file").unwrap();
        let b = derive_file_root_key(&[2u8; ROOT_KEY_SIZE], b"file").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
