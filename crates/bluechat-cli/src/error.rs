//! Error handling for the BlueChat CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("BlueChat error: {0}")]
    Core(#[from] bluechat_core::BluechatError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message not delivered: {0}")]
    SendFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Runtime stopped unexpectedly")]
    RuntimeStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
