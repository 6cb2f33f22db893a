//! Repository error types
//!
//! Readers report failures as a [`RepositoryError`], which the repository
//! facade hands back to the caller untouched. The error carries the operation
//! that failed and a [`RepositoryErrorKind`] so callers can branch on the
//! category without parsing messages.
//!
//! # Example
//!
//! ```rust
//! use docstore_repository::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
//!
//! let error = RepositoryError::cancelled(RepositoryOperation::Count);
//! assert!(matches!(error.kind, RepositoryErrorKind::Cancelled));
//! assert!(error.is_cancelled());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Counting documents matching a filter
    Count,
    /// Checking whether any document matches a filter
    Any,
    /// Loading a single document by its key
    GetById,
    /// Loading the first document matching a filter
    GetOne,
    /// Loading every document matching a filter
    GetAll,
    /// Seeding a document into a reader's backing store
    Insert,
    /// Connecting to the document store
    Connect,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Any => write!(f, "any"),
            Self::GetById => write!(f, "get_by_id"),
            Self::GetOne => write!(f, "get_one"),
            Self::GetAll => write!(f, "get_all"),
            Self::Insert => write!(f, "insert"),
            Self::Connect => write!(f, "connect"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// The document store could not be reached
    StorageUnavailable,
    /// The filter cannot be evaluated against the document type
    MalformedFilter,
    /// The caller's cancellation token fired before the operation finished
    Cancelled,
    /// The store rejected the caller's credentials or permissions
    AuthorizationDenied,
    /// Operation timed out
    Timeout,
    /// Underlying database error
    DatabaseError,
    /// Serialization or deserialization error
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageUnavailable => write!(f, "storage_unavailable"),
            Self::MalformedFilter => write!(f, "malformed_filter"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::AuthorizationDenied => write!(f, "authorization_denied"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
///
/// # Example
///
/// ```rust
/// use docstore_repository::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::storage_unavailable(RepositoryOperation::Count, "connection refused");
/// assert!(error.is_retriable());
/// assert_eq!(
///     error.to_string(),
///     "Repository storage_unavailable error during count: connection refused"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The document type involved (e.g., "Order")
    pub entity_type: Option<String>,
    /// The key of the document involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a storage unavailable error
    pub fn storage_unavailable(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::StorageUnavailable, message)
    }

    /// Create a malformed filter error
    ///
    /// # Example
    ///
    /// ```rust
    /// use docstore_repository::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
    ///
    /// let error = RepositoryError::malformed_filter(
    ///     RepositoryOperation::GetAll,
    ///     "LIKE requires a string pattern",
    /// );
    /// assert_eq!(error.kind, RepositoryErrorKind::MalformedFilter);
    /// ```
    pub fn malformed_filter(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::MalformedFilter, message)
    }

    /// Create a cancellation error for the given operation
    pub fn cancelled(operation: RepositoryOperation) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::Cancelled,
            "Operation cancelled by caller",
        )
    }

    /// Create an authorization denied error
    pub fn authorization_denied(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::AuthorizationDenied, message)
    }

    /// Create a timeout error
    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    /// Add document context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// The repository facade never retries on its own; this is a hint for callers.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::StorageUnavailable | RepositoryErrorKind::Timeout
        )
    }

    /// Check if the operation failed because its cancellation token fired
    pub fn is_cancelled(&self) -> bool {
        self.kind == RepositoryErrorKind::Cancelled
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(format!("{}", RepositoryOperation::Count), "count");
        assert_eq!(format!("{}", RepositoryOperation::Any), "any");
        assert_eq!(format!("{}", RepositoryOperation::GetById), "get_by_id");
        assert_eq!(format!("{}", RepositoryOperation::GetOne), "get_one");
        assert_eq!(format!("{}", RepositoryOperation::GetAll), "get_all");
        assert_eq!(format!("{}", RepositoryOperation::Insert), "insert");
        assert_eq!(format!("{}", RepositoryOperation::Connect), "connect");
    }

    #[test]
    fn test_repository_error_kind_display() {
        assert_eq!(
            format!("{}", RepositoryErrorKind::StorageUnavailable),
            "storage_unavailable"
        );
        assert_eq!(
            format!("{}", RepositoryErrorKind::MalformedFilter),
            "malformed_filter"
        );
        assert_eq!(format!("{}", RepositoryErrorKind::Cancelled), "cancelled");
        assert_eq!(
            format!("{}", RepositoryErrorKind::AuthorizationDenied),
            "authorization_denied"
        );
        assert_eq!(format!("{}", RepositoryErrorKind::Timeout), "timeout");
        assert_eq!(
            format!("{}", RepositoryErrorKind::SerializationError),
            "serialization_error"
        );
    }

    #[test]
    fn test_cancelled_convenience() {
        let error = RepositoryError::cancelled(RepositoryOperation::GetAll);
        assert_eq!(error.operation, RepositoryOperation::GetAll);
        assert!(error.is_cancelled());
        assert!(!error.is_retriable());
    }

    #[test]
    fn test_is_retriable() {
        assert!(RepositoryError::storage_unavailable(RepositoryOperation::Count, "down").is_retriable());
        assert!(RepositoryError::timeout(RepositoryOperation::Count, "slow").is_retriable());
        assert!(!RepositoryError::malformed_filter(RepositoryOperation::Count, "bad").is_retriable());
        assert!(
            !RepositoryError::authorization_denied(RepositoryOperation::Count, "denied")
                .is_retriable()
        );
    }

    #[test]
    fn test_display_without_entity() {
        let error = RepositoryError::database_error(RepositoryOperation::GetOne, "Query failed");
        let display = error.to_string();
        assert!(display.contains("database_error"));
        assert!(display.contains("get_one"));
        assert!(display.contains("Query failed"));
        assert!(!display.contains('['));
    }

    #[test]
    fn test_display_with_entity() {
        let error = RepositoryError::serialization_error(RepositoryOperation::GetById, "bad key")
            .with_entity("Order", "ord_123");
        assert!(error.to_string().ends_with("[Order: ord_123]"));
    }

    #[test]
    fn test_error_is_error_trait() {
        let error: Box<dyn std::error::Error> =
            Box::new(RepositoryError::cancelled(RepositoryOperation::Count));
        assert!(error.to_string().contains("cancelled"));
    }
}
