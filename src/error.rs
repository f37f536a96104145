use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid box geometry: width={width}, height={height}")]
    InvalidGeometry { width: i64, height: i64 },

    #[error("elapsed time must be positive, got {elapsed_secs}s")]
    NonPositiveElapsed { elapsed_secs: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("detector failed: {0}")]
    Detector(#[source] Box<dyn std::error::Error + Send + Sync>),
}
