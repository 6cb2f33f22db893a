//! Keyed read-only repositories over document-store readers
//!
//! This module provides the repository facade and the reader abstraction it
//! delegates to.
//!
//! # Features
//!
//! - **Facade**: [`KeyedReadOnlyRepository`] forwards every read to its reader
//!   exactly once, defaulting the partition key and cancellation token
//! - **Reader seam**: [`DocumentReader`] for plugging in a document store
//! - **Filtering**: [`Filter`] and [`FilterCondition`] for typed predicates
//! - **Pagination**: [`Pagination`] for windowed reads
//! - **Readers**: [`InMemoryReader`] (feature `memory`) and
//!   `RecordingReader` (feature `testing`) for tests
//!
//! # Example
//!
//! ```rust,ignore
//! use docstore_repository::repository::{
//!     Filter, FilterCondition, KeyedReadOnlyRepository, ReadOptions,
//! };
//!
//! let orders = KeyedReadOnlyRepository::<Order, _>::new(reader);
//! let open = Filter::with(FilterCondition::eq("status", "open"));
//!
//! let everywhere = orders.count(&open).await?;
//! let in_eu = orders
//!     .count_with(&open, ReadOptions::new().partition_key("eu").cancellation(token))
//!     .await?;
//! ```

mod document;
mod error;
mod filter;
mod keyed;
#[cfg(feature = "memory")]
mod memory;
mod options;
mod pagination;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod traits;

pub use document::{collection_name, partitioned_collection_name, Document};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use filter::{Filter, FilterCondition, FilterOperator, FilterValue};
pub use keyed::KeyedReadOnlyRepository;
#[cfg(feature = "memory")]
pub use memory::InMemoryReader;
pub use options::ReadOptions;
pub use pagination::Pagination;
pub use traits::{DocumentReader, RepositoryResult};
