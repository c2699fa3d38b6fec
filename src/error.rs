//! Error types for Drishti

use crate::streaming::packet::CodecError;
use std::io::ErrorKind;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Drishti error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Peer (sensor or consumer) closed or reset the connection
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// Packet codec failure
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the error means the remote end is gone and the owning
    /// loop should stop rather than retry on the next tick.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Disconnected(_) => true,
            Error::Io(e) => is_disconnect_kind(e.kind()),
            _ => false,
        }
    }
}

/// I/O error kinds that indicate a dead connection.
pub fn is_disconnect_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
    )
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
