/*!
 * Error types for the srt-translator application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Per-block errors (`TranslationError::TranslationFailed`) are absorbed by the
 * orchestrator; per-file errors (`SubtitleError`, I/O) are absorbed by the batch
 * runner. Nothing here ever aborts sibling jobs.
 */

use thiserror::Error;

/// Errors that can occur when talking to the model service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The service could not be reached (connection refused, DNS, reset)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

impl ProviderError {
    /// Whether another attempt may succeed.
    ///
    /// Connection failures, timeouts and 5xx responses are transient. Client
    /// errors (unknown model, bad request) and undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) => false,
        }
    }

    /// Whether the endpoint itself looks unreachable
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::ApiError {
                status_code: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            Self::ConnectionError(error.to_string())
        }
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// A cue group could not be parsed; `block` is the 1-based group ordinal
    #[error("Malformed subtitle block {block}: {reason}")]
    StructuralParse {
        /// Position of the offending cue group in the file (1-based)
        block: usize,
        /// What was wrong with it
        reason: String,
    },
}

/// Errors that can occur during translation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// A single block exhausted its attempts
    #[error("Translation of block {block} failed after {attempts} attempt(s): {source}")]
    TranslationFailed {
        /// Block number (1-based, in file order)
        block: usize,
        /// How many requests were sent
        attempts: u32,
        /// Last underlying error
        #[source]
        source: ProviderError,
    },

    /// The endpoint could not be reached on the first attempted block of a job
    #[error("Model service unavailable: {0}")]
    ServiceUnavailable(ProviderError),
}

impl TranslationError {
    /// The provider error behind this failure
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            Self::TranslationFailed { source, .. } => source,
            Self::ServiceUnavailable(source) => source,
        }
    }
}

/// Errors that end a single file job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// The source file could not be read
    #[error("Failed to read {}: {message}", path.display())]
    Read {
        path: std::path::PathBuf,
        message: String,
    },

    /// The translated file could not be written
    #[error("Failed to write {}: {message}", path.display())]
    Write {
        path: std::path::PathBuf,
        message: String,
    },

    #[error(transparent)]
    Subtitle(#[from] SubtitleError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}
