//! Error types for smart account operations

use thiserror::Error;

/// Result type alias for smart account operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad error classes, mirroring how callers are expected to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong parameter count, wrong type, wrong-length address or signature
    Shape,
    /// Value does not fit the target field, or an invalid owner/threshold combination
    Range,
    /// Ambiguous or missing configuration
    Configuration,
    /// Signing or key handling failed
    Crypto,
    /// Encoding/decoding of an external representation failed
    Serialization,
    /// Submission collaborator failures (bundler RPC)
    Transport,
}

/// Errors that can occur while building, hashing or signing account operations
#[derive(Debug, Error)]
pub enum Error {
    // ============ Shape Errors ============
    /// Number of values does not match the parameter type list
    #[error("Parameter count mismatch: expected {expected}, got {actual}")]
    ParameterCount { expected: usize, actual: usize },

    /// Value does not match its declared ABI type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Address field is not exactly 20 bytes
    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidAddressLength(usize),

    /// Address string could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Signature has the wrong shape
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Operation shape does not match the requested entry point version
    #[error("Entry point version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    /// Unknown or unsupported entry point version
    #[error("Unsupported entry point version: {0}")]
    UnsupportedVersion(String),

    // ============ Range Errors ============
    /// Integer does not fit the target field
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Threshold is zero or exceeds the number of owners
    #[error("Invalid threshold: {threshold} of {owners} owners")]
    InvalidThreshold { threshold: u64, owners: usize },

    // ============ Configuration Errors ============
    /// Invalid or incomplete configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Signer identity cannot be resolved without more context
    #[error("Ambiguous signer resolution: {0}")]
    AmbiguousSigner(String),

    // ============ Cryptographic Errors ============
    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ============ Submission Errors ============
    /// Bundler unreachable or returned an unusable response
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Bundler answered with a JSON-RPC error object (e.g. an AA2x/AA3x rejection)
    #[error("Bundler rejected request ({code}): {message}")]
    Bundler { code: i64, message: String },

    /// Timeout waiting for inclusion
    #[error("Timeout waiting for {0}")]
    Timeout(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ParameterCount { .. }
            | Error::TypeMismatch { .. }
            | Error::InvalidAddressLength(_)
            | Error::InvalidAddress(_)
            | Error::InvalidSignature(_)
            | Error::VersionMismatch { .. }
            | Error::UnsupportedVersion(_) => ErrorKind::Shape,
            Error::OutOfRange(_) | Error::InvalidThreshold { .. } => ErrorKind::Range,
            Error::InvalidConfig(_) | Error::AmbiguousSigner(_) => ErrorKind::Configuration,
            Error::Crypto(_) => ErrorKind::Crypto,
            Error::Serialization(_) | Error::Deserialization(_) => ErrorKind::Serialization,
            Error::Rpc(_) | Error::Bundler { .. } | Error::Timeout(_) => ErrorKind::Transport,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Deserialization(e.to_string())
    }
}

impl From<alloy_rlp::Error> for Error {
    fn from(e: alloy_rlp::Error) -> Self {
        Error::Deserialization(format!("RLP: {}", e))
    }
}
