use thiserror::Error;

pub type KhtResult<T> = Result<T, KhtError>;

#[derive(Debug, Error)]
pub enum KhtError {
    #[error("invalid tree parameters: {0}")]
    InvalidParameters(String),

    #[error("offset {offset} greater than maximum size {max_size}")]
    OffsetOutOfRange { offset: u64, max_size: u64 },

    #[error("keyed hash error: {0}")]
    KeyedHash(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
