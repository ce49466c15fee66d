//! Error types for the tonecast analysis pipeline.
//!
//! Errors are organized by concern. Provider-level failures are recovered
//! inside the chain and only the image-level variants of [`AnalysisError`]
//! ever reach a caller of [`crate::Tonecast::analyze`].

use thiserror::Error;

/// Top-level error type for tonecast operations.
#[derive(Error, Debug)]
pub enum TonecastError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Analysis pipeline errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Sidecar document errors
    #[error("Sidecar error: {0}")]
    Sidecar(#[from] SidecarError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while conditioning, analyzing or encoding an image.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The upload contained no bytes at all
    #[error("Image is empty (0 bytes)")]
    EmptyInput,

    /// Conditioning could not bring the payload under the ceiling
    #[error("Payload still too large after conditioning: ~{estimated} bytes > {limit} bytes")]
    PayloadTooLarge { estimated: u64, limit: u64 },

    /// No credential configured for the provider
    #[error("{provider} is not configured (missing API key)")]
    ProviderUnavailable { provider: String },

    /// Transport error or non-success HTTP status
    #[error("{provider} request failed: {message}")]
    ProviderRequestFailed {
        provider: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Provider did not answer within its time budget
    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// Provider replied but no structured object could be extracted
    #[error("Could not parse {provider} response: {message}")]
    ResponseParseError { provider: String, message: String },

    /// Structured object is missing required groups
    #[error("Invalid {provider} response: {message}")]
    ValidationError { provider: String, message: String },

    /// Every configured provider advanced
    #[error("All providers exhausted ({attempted} attempted)")]
    AllProvidersExhausted { attempted: usize },

    /// The image cannot be decoded, so not even the heuristic can run
    #[error("Could not analyze image: {0}")]
    ImageUndecodable(String),

    /// Re-encoding the image failed
    #[error("Image encode failed: {0}")]
    Encode(String),
}

/// Errors raised while reading a sidecar document back.
#[derive(Error, Debug)]
pub enum SidecarError {
    /// A required tag is absent from the document
    #[error("Missing <crs:{0}> in sidecar document")]
    MissingField(String),

    /// A tag carried a value that is not a number
    #[error("Invalid value for <crs:{tag}>: {value:?}")]
    InvalidNumber { tag: String, value: String },
}

/// Convenience type alias for tonecast results.
pub type Result<T> = std::result::Result<T, TonecastError>;

/// Convenience type alias for analysis-specific results.
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
