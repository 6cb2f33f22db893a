//! # docstore-repository
//!
//! Keyed read-only repositories over pluggable document-store readers.
//!
//! ## Features
//!
//! - **Repository facade**: [`KeyedReadOnlyRepository`](repository::KeyedReadOnlyRepository)
//!   counts and loads documents, with optional partition scoping and cooperative cancellation
//! - **Readers**: in-memory (`memory`, default), SurrealDB (`surrealdb`) and a
//!   recording test double (`testing`)
//! - **Configuration**: layered TOML and environment configuration via figment
//! - **Observability**: JSON tracing output with per-call spans
//!
//! ## Example
//!
//! ```rust,no_run
//! use docstore_repository::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Order {
//!     id: String,
//!     status: String,
//! }
//!
//! impl Document for Order {
//!     type Key = String;
//!     const COLLECTION: &'static str = "Orders";
//!
//!     fn id(&self) -> &String {
//!         &self.id
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let reader = ConfiguredReader::from_config(&config).await?;
//!     let orders = KeyedReadOnlyRepository::<Order, _>::new(reader);
//!
//!     let open = Filter::with(FilterCondition::eq("status", "open"));
//!     let token = CancellationToken::new();
//!     let count = orders
//!         .count_with(&open, ReadOptions::new().partition_key("eu").cancellation(token))
//!         .await?;
//!
//!     tracing::info!(count, "open orders in eu");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod observability;
#[cfg(any(feature = "memory", feature = "surrealdb"))]
pub mod reader;
pub mod repository;

#[cfg(feature = "surrealdb")]
pub mod surrealdb_backend;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, ReaderBackend, ReaderConfig, ServiceConfig};

    #[cfg(feature = "surrealdb")]
    pub use crate::config::SurrealDbConfig;

    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;

    #[cfg(any(feature = "memory", feature = "surrealdb"))]
    pub use crate::reader::ConfiguredReader;

    pub use crate::repository::{
        Document, DocumentReader, Filter, FilterCondition, FilterOperator, FilterValue,
        KeyedReadOnlyRepository, Pagination, ReadOptions, RepositoryError, RepositoryErrorKind,
        RepositoryOperation, RepositoryResult,
    };

    #[cfg(feature = "memory")]
    pub use crate::repository::InMemoryReader;

    #[cfg(feature = "surrealdb")]
    pub use crate::surrealdb_backend::{SurrealClient, SurrealReader};

    pub use tokio_util::sync::CancellationToken;
}
