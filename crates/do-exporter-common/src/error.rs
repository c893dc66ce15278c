use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Timeout(_) => "timeout",
            Self::Upstream(_) => "upstream",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InternalError(_) => "internal",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
