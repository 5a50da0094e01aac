use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{KhtError, KhtResult};

/// Top-level configuration (loaded from kht.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KhtConfig {
    pub tree: TreeConfig,
    pub log: LogConfig,
}

/// Shape of a keyed hash tree and the keyed hash it is built on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Leaf block size in bytes (default: 1024)
    pub block_size: u64,
    /// Largest addressable offset in bytes (default: 4 GiB)
    pub max_size: u64,
    /// Branching factor, must be > 1 (default: 8)
    pub factor: f64,
    /// HMAC digest: "md5", "sha256" or "sha512" (default: sha256)
    pub hash: HashAlgorithm,
}

/// Digest underlying the HMAC used at every tree level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Digest length in bytes, which is also the derived key length.
    pub fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = KhtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(KhtError::Config(format!("unknown hash algorithm: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            max_size: 1 << 32,
            factor: 8.0,
            hash: HashAlgorithm::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::default(),
        }
    }
}

impl KhtConfig {
    pub fn from_toml_str(s: &str) -> KhtResult<Self> {
        toml::from_str(s).map_err(|e| KhtError::Config(format!("parsing config: {e}")))
    }

    /// Load the config at `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> KhtResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| KhtError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_toml(&self) -> KhtResult<String> {
        toml::to_string_pretty(self).map_err(|e| KhtError::Config(format!("serializing config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[tree]
block_size = 2
max_size = 16
factor = 8.0
hash = "md5"

[log]
level = "debug"
format = "json"
"#;
        let config = KhtConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(config.tree.block_size, 2);
        assert_eq!(config.tree.max_size, 16);
        assert_eq!(config.tree.factor, 8.0);
        assert_eq!(config.tree.hash, HashAlgorithm::Md5);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_defaults() {
        let config = KhtConfig::from_toml_str("").unwrap();

        assert_eq!(config, KhtConfig::default());
        assert_eq!(config.tree.block_size, 1024);
        assert_eq!(config.tree.max_size, 4_294_967_296);
        assert_eq!(config.tree.hash, HashAlgorithm::Sha256);
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = KhtConfig::from_toml_str("[tree]\nfactor = 1024.0\n").unwrap();

        assert_eq!(config.tree.factor, 1024.0);
        assert_eq!(config.tree.block_size, 1024);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_unknown_hash_rejected() {
        let result = KhtConfig::from_toml_str("[tree]\nhash = \"crc32\"\n");
        assert!(matches!(result, Err(KhtError::Config(_))));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut config = KhtConfig::default();
        config.tree.hash = HashAlgorithm::Sha512;
        config.tree.factor = 2.5;

        let rendered = config.to_toml().unwrap();
        let parsed = KhtConfig::from_toml_str(&rendered).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KhtConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, KhtConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tree]\nblock_size = 4096").unwrap();

        let config = KhtConfig::load(file.path()).unwrap();
        assert_eq!(config.tree.block_size, 4096);
    }

    #[test]
    fn test_hash_algorithm_from_str() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::Md5.to_string(), "md5");
        assert_eq!(HashAlgorithm::Sha512.output_size(), 64);
        assert!("blake2".parse::<HashAlgorithm>().is_err());
    }
}
