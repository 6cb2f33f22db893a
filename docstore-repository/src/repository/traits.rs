//! Reader trait definitions
//!
//! [`DocumentReader`] is the seam between the repository facade and a concrete
//! document store. It uses RPITIT (Return Position Impl Trait In Traits), so
//! implementations write plain `async fn`s and the returned futures are `Send`.
//!
//! Every method takes the filter or key, the partition key (`None` meaning no
//! partition restriction) and the caller's cancellation token. Implementations
//! must fail with [`RepositoryErrorKind::Cancelled`](super::RepositoryErrorKind::Cancelled)
//! once the token fires instead of returning a partial result.
//!
//! # Example
//!
//! ```rust,ignore
//! use docstore_repository::repository::{DocumentReader, Document, Filter, RepositoryResult};
//!
//! struct MyReader { /* driver handle */ }
//!
//! impl DocumentReader for MyReader {
//!     async fn count<D: Document>(
//!         &self,
//!         filter: &Filter<D>,
//!         partition_key: Option<&str>,
//!         cancellation: &CancellationToken,
//!     ) -> RepositoryResult<u64> {
//!         // Translate the filter and run it against the driver
//!         todo!()
//!     }
//!     // ... other methods
//! }
//! ```

use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::document::Document;
use super::error::RepositoryError;
use super::filter::Filter;
use super::pagination::Pagination;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Read access to a document store
///
/// Methods are generic over the document type; the key type always comes from
/// `D::Key`.
pub trait DocumentReader: Send + Sync {
    /// Count documents matching the filter
    fn count<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Check whether at least one document matches the filter
    fn any<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Load the document with the given key
    ///
    /// Returns `Ok(None)` when no such document exists.
    fn get_by_id<D: Document>(
        &self,
        id: &D::Key,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Option<D>>> + Send;

    /// Load the first document matching the filter
    fn get_one<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Option<D>>> + Send;

    /// Load the documents matching the filter, optionally windowed
    fn get_all<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        pagination: Option<Pagination>,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<D>>> + Send;
}
