//! Terminal shell errors
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("scene error: {0}")]
    Scene(#[from] arbor_core::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
