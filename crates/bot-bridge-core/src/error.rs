//! Error types for the bot bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
///
/// None of these escape into the control loop: the orchestrator turns each
/// one into a log line and a continue/terminate decision.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Peer process could not be located or started
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// Peer input channel closed or failed
    #[error("Write error: {0}")]
    Write(String),

    /// Peer output channel failed or timed out
    #[error("Read error: {0}")]
    Read(String),

    /// Command line could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Command name outside the fixed vocabulary
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Invalid bridge configuration
    #[error("Config error: {0}")]
    Config(String),
}

/// Per-line decode failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Blank line
    #[error("empty line")]
    Empty,

    /// A key was present with no value, e.g. `{cmd:}`
    #[error("missing value for key '{0}'")]
    MissingValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_converts() {
        let err: BridgeError = DecodeError::MissingValue("cmd").into();
        assert_eq!(err.to_string(), "Decode error: missing value for key 'cmd'");
    }
}
