use thiserror::Error;

/// Everything that can go wrong while building planet textures
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("noise configuration must contain at least one layer")]
    EmptyConfiguration,
    #[error("noise layer {index}: {reason}")]
    InvalidLayer { index: usize, reason: String },
    #[error("noise layers carry no strength, at least one must be positive")]
    WeightlessConfiguration,
    #[error("resolution tiers must be non-empty, non-zero and strictly increasing")]
    InvalidTiers,
    #[error("invalid planet options: {0}")]
    InvalidOptions(String),
    #[error("failed to allocate a {resolution}x{resolution} pixel buffer")]
    Allocation { resolution: u32 },
    #[error("buffer is {found}x{found}, expected {expected}x{expected}")]
    DimensionMismatch { expected: u32, found: u32 },
    #[error("reference image is unusable: {0}")]
    Reference(String),
    #[error("synthesis worker is unavailable")]
    WorkerUnavailable,
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("texture pipeline has been disposed")]
    Disposed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to parse planet options: {0}")]
    Options(#[from] ron::error::SpannedError),
}
