use std::fmt;
use thiserror::Error;

/// Input rejected before any external call is made
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Neither a source URL nor a transcript was supplied
    #[error("Either a source URL or a transcript is required")]
    MissingSource,

    /// The URL could not be parsed or uses an unsupported scheme
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    /// A video URL whose id could not be extracted
    #[error("Could not extract a video id from {platform} URL: {url}")]
    UnrecognizedVideoUrl { platform: String, url: String },

    /// Transcript text is empty or too short to contain a recipe
    #[error("Transcript is too short ({0} characters)")]
    TranscriptTooShort(usize),
}

/// Why a source could not be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureReason {
    NotFound,
    Blocked,
    Timeout,
    ParseFailure,
    Network,
}

impl fmt::Display for FetchFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchFailureReason::NotFound => "not found",
            FetchFailureReason::Blocked => "blocked",
            FetchFailureReason::Timeout => "timed out",
            FetchFailureReason::ParseFailure => "unparseable",
            FetchFailureReason::Network => "network failure",
        };
        f.write_str(label)
    }
}

/// Failure to fetch raw text from a source adapter
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Source fetch failed ({reason}): {message}")]
pub struct SourceFetchError {
    pub reason: FetchFailureReason,
    pub message: String,
}

impl SourceFetchError {
    pub fn new(reason: FetchFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FetchFailureReason::NotFound, message)
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::new(FetchFailureReason::Blocked, message)
    }

    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(FetchFailureReason::ParseFailure, message)
    }

    /// Classify an HTTP status returned by a source
    pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        let reason = match status.as_u16() {
            404 | 410 => FetchFailureReason::NotFound,
            401 | 403 | 429 | 451 => FetchFailureReason::Blocked,
            408 | 504 => FetchFailureReason::Timeout,
            _ => FetchFailureReason::Network,
        };
        Self::new(reason, format!("{url} returned HTTP {status}"))
    }
}

impl From<reqwest::Error> for SourceFetchError {
    fn from(err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            FetchFailureReason::Timeout
        } else if err.is_decode() {
            FetchFailureReason::ParseFailure
        } else if let Some(status) = err.status() {
            return SourceFetchError::from_status(status, err.url().map_or("", |u| u.as_str()));
        } else {
            FetchFailureReason::Network
        };
        Self::new(reason, err.to_string())
    }
}

/// Category of a structuring engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuringErrorKind {
    AuthInvalid,
    RateLimited,
    ServerError,
    ParseFailure,
}

impl fmt::Display for StructuringErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StructuringErrorKind::AuthInvalid => "invalid credentials",
            StructuringErrorKind::RateLimited => "rate limited",
            StructuringErrorKind::ServerError => "server error",
            StructuringErrorKind::ParseFailure => "unparseable response",
        };
        f.write_str(label)
    }
}

/// Failure reported by, or while talking to, the structuring engine
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Structuring failed ({kind}): {message}")]
pub struct StructuringError {
    pub kind: StructuringErrorKind,
    pub message: String,
}

impl StructuringError {
    pub fn new(kind: StructuringErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(StructuringErrorKind::ParseFailure, message)
    }

    /// Classify a non-success HTTP status from a provider
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let kind = match status.as_u16() {
            401 | 403 => StructuringErrorKind::AuthInvalid,
            429 => StructuringErrorKind::RateLimited,
            _ => StructuringErrorKind::ServerError,
        };
        let snippet: String = body.chars().take(200).collect();
        Self::new(kind, format!("HTTP {status}: {snippet}"))
    }
}

impl From<reqwest::Error> for StructuringError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return StructuringError::from_status(status, &err.to_string());
        }
        let kind = if err.is_decode() {
            StructuringErrorKind::ParseFailure
        } else {
            StructuringErrorKind::ServerError
        };
        Self::new(kind, err.to_string())
    }
}

/// Per-ingredient catalog failure; never aborts a batch
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Catalog lookup failed for '{ingredient}': {message}")]
pub struct MatchingError {
    pub ingredient: String,
    pub message: String,
}

/// Transactional write failure; the whole write was rolled back
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("Recipe save rolled back: {0}")]
    RolledBack(String),

    #[error("Conversion record {0} not found")]
    UnknownConversion(String),

    #[error("Invalid conversion transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    SourceFetch(#[from] SourceFetchError),

    #[error(transparent)]
    Structuring(#[from] StructuringError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    BuilderError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl IngestError {
    /// HTTP status the inbound API reports for this error class
    pub fn http_status(&self) -> u16 {
        match self {
            IngestError::Validation(_) | IngestError::SourceFetch(_) => 400,
            _ => 500,
        }
    }

    /// Short machine-readable error class
    pub fn error_code(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "validation_error",
            IngestError::SourceFetch(_) => "source_fetch_error",
            IngestError::Structuring(_) => "structuring_error",
            IngestError::Persistence(_) => "persistence_error",
            IngestError::BuilderError(_) | IngestError::ConfigError(_) => "configuration_error",
        }
    }

    /// Hints for the caller on how to get a successful re-run
    pub fn troubleshooting(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            IngestError::Validation(_) => &[
                "Check that the URL is complete and starts with http:// or https://",
                "Supported video links look like youtube.com/watch?v=... or tiktok.com/@user/video/...",
            ],
            IngestError::SourceFetch(e) => match e.reason {
                FetchFailureReason::NotFound => &[
                    "The video or page may have been removed",
                    "Double-check the link for typos",
                ],
                FetchFailureReason::Blocked => &[
                    "The content may be private, age-restricted or region-locked",
                    "Try pasting the transcript or recipe text instead",
                ],
                FetchFailureReason::Timeout | FetchFailureReason::Network => &[
                    "The source did not respond in time; try again shortly",
                ],
                FetchFailureReason::ParseFailure => &[
                    "The page layout could not be read; try pasting the recipe text instead",
                ],
            },
            IngestError::Structuring(e) => match e.kind {
                StructuringErrorKind::RateLimited => {
                    &["The recipe service is busy; try again in a minute"]
                }
                _ => &["The recipe could not be structured; try again or paste the text"],
            },
            _ => &[],
        };
        hints.iter().map(|h| h.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_by_class() {
        let validation = IngestError::from(ValidationError::MissingSource);
        assert_eq!(validation.http_status(), 400);

        let fetch = IngestError::from(SourceFetchError::not_found("gone"));
        assert_eq!(fetch.http_status(), 400);

        let structuring =
            IngestError::from(StructuringError::new(StructuringErrorKind::ServerError, "boom"));
        assert_eq!(structuring.http_status(), 500);

        let persistence = IngestError::from(PersistenceError::RolledBack("x".into()));
        assert_eq!(persistence.http_status(), 500);
    }

    #[test]
    fn test_fetch_status_classification() {
        let err = SourceFetchError::from_status(reqwest::StatusCode::NOT_FOUND, "http://x");
        assert_eq!(err.reason, FetchFailureReason::NotFound);
        let err = SourceFetchError::from_status(reqwest::StatusCode::FORBIDDEN, "http://x");
        assert_eq!(err.reason, FetchFailureReason::Blocked);
        let err = SourceFetchError::from_status(reqwest::StatusCode::BAD_GATEWAY, "http://x");
        assert_eq!(err.reason, FetchFailureReason::Network);
    }

    #[test]
    fn test_structuring_status_classification() {
        let err = StructuringError::from_status(reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert_eq!(err.kind, StructuringErrorKind::AuthInvalid);
        let err = StructuringError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.kind, StructuringErrorKind::RateLimited);
        let err = StructuringError::from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.kind, StructuringErrorKind::ServerError);
    }

    #[test]
    fn test_troubleshooting_hints_present_for_blocked_source() {
        let err = IngestError::from(SourceFetchError::blocked("private video"));
        assert!(!err.troubleshooting().is_empty());
    }
}
