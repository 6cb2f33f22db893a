//! Crate-level error types
//!
//! Repository reads report [`RepositoryError`]; this module wraps it together
//! with configuration and startup failures for application code.

use thiserror::Error;

use crate::repository::RepositoryError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Structured repository error with operation context
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl Error {
    /// The repository error, if this is one
    pub fn as_repository(&self) -> Option<&RepositoryError> {
        match self {
            Error::Repository(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{RepositoryErrorKind, RepositoryOperation};

    #[test]
    fn test_repository_error_passes_through() {
        let repository_error =
            RepositoryError::timeout(RepositoryOperation::GetAll, "query exceeded 5s");
        let error: Error = repository_error.clone().into();

        assert_eq!(error.to_string(), repository_error.to_string());
        assert_eq!(
            error.as_repository().map(|e| e.kind),
            Some(RepositoryErrorKind::Timeout)
        );
    }

    #[test]
    fn test_config_error_display() {
        let error: Error = figment::Error::from("missing field `url`".to_string()).into();
        assert!(error.to_string().starts_with("Configuration error:"));
        assert!(error.as_repository().is_none());
    }

    #[test]
    fn test_internal_error_display() {
        let error = Error::Internal("reader not initialized".to_string());
        assert_eq!(error.to_string(), "Internal error: reader not initialized");
    }
}
