//! Error types for the indexing system.
//!
//! Structured variants built with thiserror. Every variant records the
//! originating operation and a timestamp; parse errors carry full file and
//! position context so the surrounding pipeline can surface them in logs.
//!
//! Note that the extraction path itself never returns these for malformed
//! source: unparseable input degrades to empty output (see the `indexing`
//! module). The taxonomy exists for the I/O and configuration edges of the
//! pipeline.

use crate::FileId;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing operations.
#[derive(Error, Debug)]
pub enum IndexError {
    /// General phase error; `recoverable` signals that retrying the
    /// operation may succeed.
    #[error("Indexing failed during {operation}: {message}")]
    Indexing {
        operation: String,
        message: String,
        recoverable: bool,
        timestamp: DateTime<Utc>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Parse failure with position context.
    #[error("Failed to parse '{path}' at {line}:{column} near '{token}'")]
    Parse {
        file_id: Option<FileId>,
        path: PathBuf,
        line: u32,
        column: u32,
        token: String,
        operation: String,
        timestamp: DateTime<Utc>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Search failure for a pattern.
    #[error("Search failed for pattern '{pattern}' during {operation}")]
    Search {
        pattern: String,
        operation: String,
        timestamp: DateTime<Utc>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File not found: '{path}' during {operation}")]
    FileNotFound {
        path: PathBuf,
        operation: String,
        timestamp: DateTime<Utc>,
    },

    #[error("File too large: '{path}' ({size} bytes, limit {limit}) during {operation}")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
        operation: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Permission denied: '{path}' during {operation}")]
    Permission {
        path: PathBuf,
        operation: String,
        timestamp: DateTime<Utc>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration field.
    #[error("Invalid configuration: {field} = '{value}'")]
    Config {
        field: String,
        value: String,
        operation: String,
        timestamp: DateTime<Utc>,
    },

    /// A non-empty collection of other errors.
    ///
    /// The message format `N errors: [...]` is relied on by log parsers;
    /// do not change the wording.
    #[error("{} errors: [{}]", .errors.len(), join_errors(.errors))]
    Multi {
        errors: Vec<IndexError>,
        timestamp: DateTime<Utc>,
    },
}

fn join_errors(errors: &[IndexError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl IndexError {
    /// General indexing error, not recoverable.
    pub fn indexing(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Indexing {
            operation: operation.into(),
            message: message.into(),
            recoverable: false,
            timestamp: Utc::now(),
            source: None,
        }
    }

    /// General indexing error that is safe to retry.
    pub fn recoverable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Indexing {
            operation: operation.into(),
            message: message.into(),
            recoverable: true,
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn parse(
        file_id: Option<FileId>,
        path: impl Into<PathBuf>,
        line: u32,
        column: u32,
        token: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Parse {
            file_id,
            path: path.into(),
            line,
            column,
            token: token.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn search(pattern: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Search {
            pattern: pattern.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::FileNotFound {
            path: path.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn file_too_large(
        path: impl Into<PathBuf>,
        size: u64,
        limit: u64,
        operation: impl Into<String>,
    ) -> Self {
        Self::FileTooLarge {
            path: path.into(),
            size,
            limit,
            operation: operation.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn permission(path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Permission {
            path: path.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
        }
    }

    /// Attach an underlying cause for root-cause inspection.
    pub fn with_source(mut self, cause: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match &mut self {
            Self::Indexing { source, .. }
            | Self::Parse { source, .. }
            | Self::Search { source, .. }
            | Self::Permission { source, .. } => *source = Some(cause),
            _ => {}
        }
        self
    }

    /// Combine errors into one, filtering out `None` slots.
    ///
    /// Returns `None` for an empty list, the single error unchanged for a
    /// list of one, and a `Multi` otherwise.
    pub fn combine(errors: impl IntoIterator<Item = Option<IndexError>>) -> Option<Self> {
        let mut errors: Vec<IndexError> = errors.into_iter().flatten().collect();
        match errors.len() {
            0 => None,
            1 => Some(errors.remove(0)),
            _ => Some(Self::Multi {
                errors,
                timestamp: Utc::now(),
            }),
        }
    }

    /// Whether the failed operation is safe to retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Indexing { recoverable, .. } => *recoverable,
            Self::Multi { errors, .. } => errors.iter().all(|e| e.is_recoverable()),
            _ => false,
        }
    }

    /// The operation that produced this error.
    pub fn operation(&self) -> &str {
        match self {
            Self::Indexing { operation, .. }
            | Self::Parse { operation, .. }
            | Self::Search { operation, .. }
            | Self::FileNotFound { operation, .. }
            | Self::FileTooLarge { operation, .. }
            | Self::Permission { operation, .. }
            | Self::Config { operation, .. } => operation,
            Self::Multi { .. } => "multi",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Indexing { timestamp, .. }
            | Self::Parse { timestamp, .. }
            | Self::Search { timestamp, .. }
            | Self::FileNotFound { timestamp, .. }
            | Self::FileTooLarge { timestamp, .. }
            | Self::Permission { timestamp, .. }
            | Self::Config { timestamp, .. }
            | Self::Multi { timestamp, .. } => *timestamp,
        }
    }

    /// Get recovery suggestions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Indexing {
                recoverable: true, ..
            } => vec!["Try the operation again, it may succeed on retry"],
            Self::Parse { .. } => vec![
                "Check that the file is valid source code for its extension",
                "Files that cannot be parsed are skipped, not fatal",
            ],
            Self::FileNotFound { .. } => {
                vec!["Check that the file exists and was registered in the content store"]
            }
            Self::FileTooLarge { .. } => {
                vec!["Raise the size limit or exclude the file from indexing"]
            }
            Self::Permission { .. } => {
                vec!["Check read permissions on the file and its parent directories"]
            }
            Self::Config { .. } => vec!["Fix the named field and retry"],
            _ => vec![],
        }
    }
}

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_error_message_format() {
        let err = IndexError::combine(vec![
            Some(IndexError::indexing("scan", "boom")),
            None,
            Some(IndexError::file_not_found("/tmp/x.go", "read")),
        ])
        .unwrap();

        let msg = err.to_string();
        assert!(msg.starts_with("2 errors: ["), "got: {msg}");
        assert!(msg.ends_with(']'));
        assert!(msg.contains("; "));
    }

    #[test]
    fn test_combine_filters_and_unwraps() {
        assert!(IndexError::combine(vec![None, None]).is_none());

        let single = IndexError::combine(vec![Some(IndexError::indexing("x", "y"))]).unwrap();
        assert!(matches!(single, IndexError::Indexing { .. }));
    }

    #[test]
    fn test_recoverable_flag() {
        assert!(IndexError::recoverable("parse", "transient").is_recoverable());
        assert!(!IndexError::indexing("parse", "fatal").is_recoverable());
        assert!(!IndexError::file_not_found("/a", "read").is_recoverable());
    }

    #[test]
    fn test_parse_error_context() {
        let err = IndexError::parse(FileId::new(1), "src/app.ts", 10, 4, "=>", "extract");
        let msg = err.to_string();
        assert!(msg.contains("src/app.ts"));
        assert!(msg.contains("10:4"));
        assert!(msg.contains("=>"));
        assert_eq!(err.operation(), "extract");
    }

    #[test]
    fn test_config_error() {
        let err = IndexError::config("ttl", "-5", "cache_init");
        assert!(err.to_string().contains("ttl"));
        assert!(err.to_string().contains("-5"));
    }
}
