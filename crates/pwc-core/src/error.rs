//! Error types for pw-comp

use thiserror::Error;

/// Core error type
///
/// Only non-real-time paths (construction, configuration, test utilities)
/// return errors. Block and sample processing never fail.
#[derive(Error, Debug)]
pub enum PwcError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(usize),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Buffer layout error: {0}")]
    BufferLayout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type PwcResult<T> = Result<T, PwcError>;
