//! Error types for osskit-core
//!
//! Every adapter translates provider-native failures into this taxonomy at
//! the boundary, so callers only ever match on one enum.

use std::fmt::Display;

use thiserror::Error;

/// Result type alias for osskit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for osskit operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument is empty or malformed. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid named configuration or provider identifier
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bucket or object already exists where uniqueness is required
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A conditional request's precondition did not hold
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Bucket or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Opaque transport or server failure reported by a provider
    #[error("Provider error: {0}")]
    Provider(String),

    /// The caller cancelled a long-running operation
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a provider failure with the operation it interrupted
    pub fn provider(context: impl Display, source: impl Display) -> Self {
        Error::Provider(format!("{context}: {source}"))
    }

    /// Classify a provider failure by HTTP status.
    ///
    /// Only 404, 409 and the conditional-request answers (304, 412) carry
    /// meaning across providers; everything else stays opaque.
    pub fn from_status(status: u16, context: impl Display) -> Self {
        match status {
            404 => Error::NotFound(context.to_string()),
            409 => Error::Conflict(context.to_string()),
            304 => Error::Precondition(format!("{context}: not modified")),
            412 => Error::Precondition(context.to_string()),
            _ => Error::Provider(format!("{context} (HTTP {status})")),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::Configuration(_) => 2, // UsageError
            Error::Provider(_) => 3,                             // ProviderError
            Error::NotFound(_) => 4,                             // NotFound
            Error::Conflict(_) | Error::Precondition(_) => 5,    // Conflict
            Error::Cancelled(_) => 130,                          // Interrupted
            _ => 1,                                              // GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::Validation("test".into()).exit_code(), 2);
        assert_eq!(Error::Configuration("test".into()).exit_code(), 2);
        assert_eq!(Error::Provider("test".into()).exit_code(), 3);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 4);
        assert_eq!(Error::Conflict("test".into()).exit_code(), 5);
        assert_eq!(Error::Precondition("test".into()).exit_code(), 5);
        assert_eq!(Error::Cancelled("test".into()).exit_code(), 130);
        assert_eq!(Error::Io(std::io::Error::other("disk")).exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::Configuration("no storage named 'minio'".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: no storage named 'minio'"
        );

        let err = Error::provider("list objects in 'logs'", "connection reset");
        assert_eq!(
            err.to_string(),
            "Provider error: list objects in 'logs': connection reset"
        );
    }

    #[test]
    fn test_from_status() {
        assert!(Error::from_status(404, "bucket 'a'").is_not_found());
        assert!(matches!(
            Error::from_status(409, "bucket 'a'"),
            Error::Conflict(_)
        ));

        assert!(matches!(
            Error::from_status(412, "object 'b/k'"),
            Error::Precondition(_)
        ));
        let err = Error::from_status(304, "object 'b/k'");
        assert!(matches!(err, Error::Precondition(_)));
        assert!(err.to_string().contains("not modified"));

        let err = Error::from_status(503, "bucket 'a'");
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("HTTP 503"));
    }
}
