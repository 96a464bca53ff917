use thiserror::Error;

/// 提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Worker pool creation failed: {0}")]
    PoolCreation(#[from] rayon::ThreadPoolBuildError),
    #[error("Invalid extractor config: {0}")]
    InvalidConfig(String),
    #[error("Worker pool is shut down")]
    PoolShutDown,
    #[error("Unknown data type '{name}'. Available types: {available}")]
    UnknownCategory { name: String, available: String },
    #[error("Extractor failed: {0}")]
    Extractor(String),
    #[error("Extractor panicked: {0}")]
    Panicked(String),
    #[error("Extraction cancelled")]
    Cancelled,
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] json5::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub fn extractor(msg: impl Into<String>) -> Self {
        ExtractionError::Extractor(msg.into())
    }

    /// Errors that end a whole call rather than a single category.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExtractionError::PoolCreation(_) | ExtractionError::InvalidConfig(_)
        )
    }
}
