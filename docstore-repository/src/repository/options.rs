//! Per-call read options
//!
//! [`ReadOptions`] carries the optional trailing arguments of every repository
//! read: a partition key and a cancellation token. Leaving either out gives
//! "no partition restriction" and a token that is never cancelled.
//!
//! # Example
//!
//! ```rust
//! use docstore_repository::repository::ReadOptions;
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let options = ReadOptions::new()
//!     .partition_key("shard-1")
//!     .cancellation(token.clone());
//!
//! assert_eq!(options.partition(), Some("shard-1"));
//! token.cancel();
//! assert!(options.token().is_cancelled());
//! ```

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ReadOptions {
    partition_key: Option<String>,
    cancellation: CancellationToken,
}

impl ReadOptions {
    /// Options with no partition key and a never-cancelled token
    pub fn new() -> Self {
        Self {
            partition_key: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Scope the read to a logical partition
    #[must_use]
    pub fn partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    /// Set or clear the partition key
    #[must_use]
    pub fn with_partition(mut self, partition_key: Option<String>) -> Self {
        self.partition_key = partition_key;
        self
    }

    /// Use the caller's cancellation token
    ///
    /// The token is forwarded to the reader as is; clones share state with it.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition_key.as_deref()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new()
    }
}
