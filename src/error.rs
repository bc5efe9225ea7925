use tch::Device;

/// Errors from loading, sampling, training and generating.
#[derive(Debug, thiserror::Error)]
pub enum BigramError {
    /// The corpus has no characters to build a vocabulary from.
    #[error("corpus is empty")]
    EmptyCorpus,

    /// A character outside the vocabulary was passed to `encode`.
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(char),

    /// A token index outside `[0, vocab_size)` was passed to `decode`.
    #[error("invalid token {0}")]
    InvalidToken(i64),

    #[error("split fraction {0} must lie strictly between 0 and 1")]
    InvalidSplit(f64),

    /// No window of `block_size + 1` tokens fits in the segment.
    #[error("segment of length {len} is too short for block size {block_size}")]
    SegmentTooShort { len: i64, block_size: i64 },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A tensor lives on a different device than the parameter table.
    #[error("device mismatch: expected {expected:?}, found {found:?}")]
    DeviceMismatch { expected: Device, found: Device },

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Torch(#[from] tch::TchError),
}

pub type Result<T> = std::result::Result<T, BigramError>;
