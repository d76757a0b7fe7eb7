//! Unified error types for critsheet.
//!
//! Every variant renders with a stable upper-case code prefix so tool
//! callers and logs can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the stylesheet pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty style queue entry).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Stylesheet reference could not be turned into a URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No local candidate and no usable remote copy.
    #[error("SOURCE_UNAVAILABLE: {0}")]
    SourceUnavailable(String),

    /// Remote fetch did not finish in time.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Remote stylesheet exceeded the configured byte limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// No fresh cache entry found for the given fingerprint.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// A cache entry exists but could not be read.
    #[error("CACHE_READ: {0}")]
    CacheRead(String),

    /// A cache entry could not be written.
    #[error("CACHE_WRITE: {0}")]
    CacheWrite(String),

    /// Fingerprint is not 64 lowercase hex characters.
    #[error("CACHE_ERROR: invalid fingerprint format")]
    InvalidFingerprint,

    /// Keyed-store database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Keyed-store migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether the error means "skip this stylesheet" rather than a cache fault.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_)
                | Error::SourceUnavailable(_)
                | Error::FetchTimeout(_)
                | Error::FetchTooLarge(_)
                | Error::HttpError(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::SourceUnavailable(msg) => (-32004, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::CacheRead(msg) => (-32002, msg.clone()),
            Error::CacheWrite(msg) => (-32002, msg.clone()),
            Error::InvalidFingerprint => (-32602, "Invalid fingerprint format".to_string()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("abc123".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);
    }

    #[test]
    fn test_invalid_fingerprint_is_invalid_params() {
        let mcp_err: McpError = Error::InvalidFingerprint.into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_source_errors() {
        assert!(Error::FetchTimeout("x".into()).is_source_error());
        assert!(Error::SourceUnavailable("x".into()).is_source_error());
        assert!(!Error::CacheWrite("x".into()).is_source_error());
    }
}
