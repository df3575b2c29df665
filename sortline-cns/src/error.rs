//! Error types for sortline-cns

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CnsError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serial write error: {0}")]
    SerialWrite(String),

    #[error("Serial read error: {0}")]
    SerialRead(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] sortline_core::Error),
}

#[cfg(feature = "serial-transport")]
impl From<serialport::Error> for CnsError {
    fn from(err: serialport::Error) -> Self {
        CnsError::Transport(err.to_string())
    }
}
