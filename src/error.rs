use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError
{
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("{0}")]
    Usage(String),

    #[error("invalid setting {name}: {reason}")]
    Config
    {
        name: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, AppError>;
