/// Centralized error types for logmill using thiserror
///
/// Only errors that make a whole source unusable, or that are fatal for the
/// process, ever leave a source. Malformed log entries and unreadable revisions
/// are absorbed where they happen.
use thiserror::Error;

/// Main error type for logmill
#[derive(Error, Debug)]
pub enum LogmillError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while opening a commit source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Log location not found: {0}")]
    NotFound(String),

    #[error("Unrecognized log format: {0}")]
    UnrecognizedFormat(String),

    #[error("Unable to find executable: {0}")]
    ExecutableNotFound(String),

    #[error("Failed to open repository '{path}': {reason}")]
    RepositoryOpen { path: String, reason: String },

    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Failed to create temporary log file: {0}")]
    TempFile(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid pattern '{pattern}' in '{key}': {reason}")]
    InvalidPattern {
        key: String,
        pattern: String,
        reason: String,
    },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

// Conversion from anyhow::Error to LogmillError
impl From<anyhow::Error> for LogmillError {
    fn from(err: anyhow::Error) -> Self {
        LogmillError::Other(format!("{:#}", err))
    }
}

impl SourceError {
    /// Failure that must reach the caller instead of skipping the location
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::TempFile(_))
    }
}

impl LogmillError {
    /// The location cannot be read as this kind of source; the caller should
    /// try another source type or skip it.
    pub fn is_source_unusable(&self) -> bool {
        matches!(self, LogmillError::Source(err) if !err.is_fatal())
    }

    /// Process-level failure that must not be retried
    pub fn is_fatal(&self) -> bool {
        match self {
            LogmillError::Source(err) => err.is_fatal(),
            LogmillError::Io(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LogmillError::Source(SourceError::NotFound("/missing.log".to_string()));
        assert_eq!(
            err.to_string(),
            "Source error: Log location not found: /missing.log"
        );
    }

    #[test]
    fn test_repository_open_display() {
        let err = SourceError::RepositoryOpen {
            path: "/repo".to_string(),
            reason: "not a git repository".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open repository '/repo': not a git repository"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LogmillError = io_err.into();
        assert!(matches!(err, LogmillError::Io(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("test error");
        let err: LogmillError = anyhow_err.into();
        assert!(matches!(err, LogmillError::Other(_)));
    }

    #[test]
    fn test_source_unusable_classification() {
        let unusable: LogmillError = SourceError::UnrecognizedFormat("x.log".to_string()).into();
        assert!(unusable.is_source_unusable());
        assert!(!unusable.is_fatal());

        let temp: LogmillError = SourceError::TempFile("disk full".to_string()).into();
        assert!(!temp.is_source_unusable());
        assert!(temp.is_fatal());
    }

    #[test]
    fn test_config_error_not_source_unusable() {
        let err: LogmillError = ConfigError::InvalidValue {
            key: "sources.find_attempts".to_string(),
            reason: "must be greater than 0".to_string(),
        }
        .into();
        assert!(!err.is_source_unusable());
        assert!(!err.is_fatal());
    }
}
