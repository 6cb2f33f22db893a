//! Reader selected from configuration

use tokio_util::sync::CancellationToken;

use crate::config::{Config, ReaderBackend};
use crate::error::{Error, Result};
#[cfg(feature = "memory")]
use crate::repository::InMemoryReader;
use crate::repository::{Document, DocumentReader, Filter, Pagination, RepositoryResult};
#[cfg(feature = "surrealdb")]
use crate::surrealdb_backend::SurrealReader;

/// The reader named by `reader.backend`
#[derive(Debug)]
pub enum ConfiguredReader {
    #[cfg(feature = "memory")]
    Memory(InMemoryReader),
    #[cfg(feature = "surrealdb")]
    Surreal(SurrealReader),
}

impl ConfiguredReader {
    /// Build the configured reader, connecting to the document store if needed
    pub async fn from_config(config: &Config) -> Result<Self> {
        tracing::debug!(backend = ?config.reader.backend, "building reader");

        match config.reader.backend {
            #[cfg(feature = "memory")]
            ReaderBackend::Memory => Ok(Self::Memory(InMemoryReader::new())),
            #[cfg(feature = "surrealdb")]
            ReaderBackend::Surrealdb => {
                let surrealdb = config.surrealdb.as_ref().ok_or_else(|| {
                    Error::Internal(
                        "reader.backend is \"surrealdb\" but no [surrealdb] section is configured"
                            .to_string(),
                    )
                })?;
                Ok(Self::Surreal(SurrealReader::connect(surrealdb).await?))
            }
            #[allow(unreachable_patterns)]
            backend => Err(Error::Internal(format!(
                "reader backend {:?} is not compiled in; enable its cargo feature",
                backend
            ))),
        }
    }
}

impl DocumentReader for ConfiguredReader {
    async fn count<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<u64> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(reader) => reader.count(filter, partition_key, cancellation).await,
            #[cfg(feature = "surrealdb")]
            Self::Surreal(reader) => reader.count(filter, partition_key, cancellation).await,
        }
    }

    async fn any<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<bool> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(reader) => reader.any(filter, partition_key, cancellation).await,
            #[cfg(feature = "surrealdb")]
            Self::Surreal(reader) => reader.any(filter, partition_key, cancellation).await,
        }
    }

    async fn get_by_id<D: Document>(
        &self,
        id: &D::Key,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Option<D>> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(reader) => reader.get_by_id(id, partition_key, cancellation).await,
            #[cfg(feature = "surrealdb")]
            Self::Surreal(reader) => reader.get_by_id(id, partition_key, cancellation).await,
        }
    }

    async fn get_one<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Option<D>> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(reader) => reader.get_one(filter, partition_key, cancellation).await,
            #[cfg(feature = "surrealdb")]
            Self::Surreal(reader) => reader.get_one(filter, partition_key, cancellation).await,
        }
    }

    async fn get_all<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        pagination: Option<Pagination>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Vec<D>> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(reader) => {
                reader
                    .get_all(filter, partition_key, pagination, cancellation)
                    .await
            }
            #[cfg(feature = "surrealdb")]
            Self::Surreal(reader) => {
                reader
                    .get_all(filter, partition_key, pagination, cancellation)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{FilterCondition, KeyedReadOnlyRepository};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Event {
        id: String,
        kind: String,
    }

    impl Document for Event {
        type Key = String;
        const COLLECTION: &'static str = "Events";

        fn id(&self) -> &String {
            &self.id
        }
    }

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn test_default_config_builds_memory_reader() {
        let reader = ConfiguredReader::from_config(&Config::default()).await.unwrap();
        let ConfiguredReader::Memory(memory) = &reader else {
            panic!("expected the in-memory reader, got {:?}", reader);
        };
        memory
            .insert(
                &Event {
                    id: "e1".into(),
                    kind: "login".into(),
                },
                None,
            )
            .unwrap();

        let events = KeyedReadOnlyRepository::<Event, _>::new(reader);
        let logins = Filter::with(FilterCondition::eq("kind", "login"));
        assert_eq!(events.count(&logins).await.unwrap(), 1);
    }

    #[cfg(feature = "surrealdb")]
    #[tokio::test]
    async fn test_surrealdb_backend_requires_section() {
        let mut config = Config::default();
        config.reader.backend = ReaderBackend::Surrealdb;

        let result = ConfiguredReader::from_config(&config).await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[cfg(feature = "surrealdb")]
    #[tokio::test]
    async fn test_surrealdb_backend_connects() {
        let mut config = Config::default();
        config.reader.backend = ReaderBackend::Surrealdb;
        config.surrealdb = Some(crate::config::SurrealDbConfig {
            url: "mem://".to_string(),
            namespace: "test".to_string(),
            database: "test".to_string(),
            username: None,
            password: None,
            max_retries: 0,
            retry_delay_secs: 1,
        });

        let reader = ConfiguredReader::from_config(&config).await.unwrap();
        assert!(matches!(reader, ConfiguredReader::Surreal(_)));

        let events = KeyedReadOnlyRepository::<Event, _>::new(reader);
        assert_eq!(events.count(&Filter::all()).await.unwrap(), 0);
    }
}
