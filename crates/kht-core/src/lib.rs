pub mod config;
pub mod error;

pub use config::{HashAlgorithm, KhtConfig, LogConfig, LogFormat, TreeConfig};
pub use error::{KhtError, KhtResult};
