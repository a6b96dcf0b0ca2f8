//!
//! _Errors_
//!
//! Every failure the client can surface. The call executor retries
//! [`TransportFailure`]s in place; everything else propagates to the caller.
//!

use thiserror::Error;

use crate::utils::languages::LanguageError;

/// Result alias used across the client
pub type TranslateResult<T> = Result<T, TranslateError>;

/// A retryable failure of a single upstream attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The attempt exceeded the per-attempt timeout
    #[error("request timed out")]
    Timeout,
    /// The upstream answered with HTTP 429 or a 5xx status
    #[error("upstream returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as returned
        body: String,
    },
}

/// Errors returned by the translation client
#[derive(Error, Debug)]
pub enum TranslateError {
    /// Input was empty or whitespace only
    #[error("input is empty after normalization")]
    EmptyInput,
    /// A retryable failure persisted through every allowed attempt
    #[error("upstream call failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made, including the first one
        attempts: u32,
        /// Failure of the final attempt
        last: TransportFailure,
    },
    /// The upstream rejected the request with a status that is not worth retrying
    #[error("upstream rejected the request with HTTP {status}: {body}")]
    NonRetryable {
        /// HTTP status code
        status: u16,
        /// Response body, as returned
        body: String,
    },
    /// The upstream could not be reached at all (DNS, TLS, refused connection)
    #[error("could not reach upstream: {0}")]
    Network(String),
    /// A 2xx response whose body matches neither expected shape
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    /// The upstream response carried no detected language
    #[error("language detection failed: {0}")]
    Detection(String),
    /// A language code the provider does not support
    #[error(transparent)]
    UnsupportedLanguage(#[from] LanguageError),
    /// The caller cancelled the request
    #[error("request was cancelled")]
    Cancelled,
    /// A failure annotated with the operation and text it belongs to
    #[error("{operation} failed for \"{text}\": {source}")]
    Context {
        /// Public operation that failed
        operation: &'static str,
        /// Preview of the input text
        text: String,
        /// Underlying error
        #[source]
        source: Box<TranslateError>,
    },
}

const PREVIEW_CHARS: usize = 40;

impl TranslateError {
    /// Wrap with the operation name and a preview of the text.
    ///
    /// Cancellation and empty input are passed through untouched, the UI
    /// treats both as "no result" rather than as failures.
    pub fn with_context(self, operation: &'static str, text: &str) -> Self {
        match self {
            TranslateError::Cancelled | TranslateError::EmptyInput => self,
            TranslateError::Context { .. } => self,
            other => {
                let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
                if text.chars().count() > PREVIEW_CHARS {
                    preview.push_str("...");
                }
                TranslateError::Context {
                    operation,
                    text: preview,
                    source: Box::new(other),
                }
            }
        }
    }

    /// The innermost error, with context wrappers stripped
    pub fn root(&self) -> &TranslateError {
        match self {
            TranslateError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the request was cancelled by the caller
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), TranslateError::Cancelled)
    }
}
