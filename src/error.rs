//! Error types for FloraMix

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FloraMixError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Ring buffer error: {0}")]
    RingBuffer(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FloraMixError>;
