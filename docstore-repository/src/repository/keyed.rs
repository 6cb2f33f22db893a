//! Keyed read-only repository facade
//!
//! [`KeyedReadOnlyRepository`] is the type application code holds. It owns a
//! shared handle to a [`DocumentReader`] and forwards every call to it exactly
//! once, filling in the optional arguments the caller left out:
//!
//! | Call | Partition key | Cancellation token |
//! |---|---|---|
//! | `count(&filter)` | `None` | never cancelled |
//! | `count_with(&filter, ReadOptions::new().cancellation(t))` | `None` | `t` |
//! | `count_with(&filter, ReadOptions::new().partition_key(p))` | `Some(p)` | never cancelled |
//! | `count_with(&filter, ReadOptions::new().partition_key(p).cancellation(t))` | `Some(p)` | `t` |
//!
//! The other read operations follow the same pattern. Results and errors come
//! back from the reader unchanged.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::Instrument;

use super::document::Document;
use super::filter::Filter;
use super::options::ReadOptions;
use super::pagination::Pagination;
use super::traits::{DocumentReader, RepositoryResult};

/// Read-only repository over documents of type `D`, backed by reader `R`
pub struct KeyedReadOnlyRepository<D, R> {
    reader: Arc<R>,
    _document: PhantomData<fn() -> D>,
}

impl<D, R> Clone for KeyedReadOnlyRepository<D, R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            _document: PhantomData,
        }
    }
}

impl<D, R> std::fmt::Debug for KeyedReadOnlyRepository<D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedReadOnlyRepository")
            .field("document", &std::any::type_name::<D>())
            .field("reader", &std::any::type_name::<R>())
            .finish()
    }
}

impl<D, R> KeyedReadOnlyRepository<D, R>
where
    D: Document,
    R: DocumentReader,
{
    pub fn new(reader: R) -> Self {
        Self::from_shared(Arc::new(reader))
    }

    /// Build a repository over a reader shared with other repositories
    pub fn from_shared(reader: Arc<R>) -> Self {
        Self {
            reader,
            _document: PhantomData,
        }
    }

    /// The shared reader handle
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Count documents matching `filter` across all partitions
    pub async fn count(&self, filter: &Filter<D>) -> RepositoryResult<u64> {
        self.count_with(filter, ReadOptions::default()).await
    }

    /// Count documents matching `filter` with explicit options
    pub async fn count_with(
        &self,
        filter: &Filter<D>,
        options: ReadOptions,
    ) -> RepositoryResult<u64> {
        let span = read_span::<D>("count", &options);
        self.reader
            .count(filter, options.partition(), options.token())
            .instrument(span)
            .await
    }

    /// Check whether any document matches `filter`
    pub async fn any(&self, filter: &Filter<D>) -> RepositoryResult<bool> {
        self.any_with(filter, ReadOptions::default()).await
    }

    pub async fn any_with(
        &self,
        filter: &Filter<D>,
        options: ReadOptions,
    ) -> RepositoryResult<bool> {
        let span = read_span::<D>("any", &options);
        self.reader
            .any(filter, options.partition(), options.token())
            .instrument(span)
            .await
    }

    /// Load the document with key `id`
    pub async fn get_by_id(&self, id: &D::Key) -> RepositoryResult<Option<D>> {
        self.get_by_id_with(id, ReadOptions::default()).await
    }

    pub async fn get_by_id_with(
        &self,
        id: &D::Key,
        options: ReadOptions,
    ) -> RepositoryResult<Option<D>> {
        let span = read_span::<D>("get_by_id", &options);
        span.in_scope(|| tracing::trace!(id = ?id, "loading document by id"));
        self.reader
            .get_by_id(id, options.partition(), options.token())
            .instrument(span)
            .await
    }

    /// Load the first document matching `filter`
    pub async fn get_one(&self, filter: &Filter<D>) -> RepositoryResult<Option<D>> {
        self.get_one_with(filter, ReadOptions::default()).await
    }

    pub async fn get_one_with(
        &self,
        filter: &Filter<D>,
        options: ReadOptions,
    ) -> RepositoryResult<Option<D>> {
        let span = read_span::<D>("get_one", &options);
        self.reader
            .get_one(filter, options.partition(), options.token())
            .instrument(span)
            .await
    }

    /// Load every document matching `filter`
    pub async fn get_all(&self, filter: &Filter<D>) -> RepositoryResult<Vec<D>> {
        self.get_all_with(filter, ReadOptions::default()).await
    }

    pub async fn get_all_with(
        &self,
        filter: &Filter<D>,
        options: ReadOptions,
    ) -> RepositoryResult<Vec<D>> {
        let span = read_span::<D>("get_all", &options);
        self.reader
            .get_all(filter, options.partition(), None, options.token())
            .instrument(span)
            .await
    }

    /// Load one page of the documents matching `filter`
    pub async fn get_paginated(
        &self,
        filter: &Filter<D>,
        pagination: Pagination,
    ) -> RepositoryResult<Vec<D>> {
        self.get_paginated_with(filter, pagination, ReadOptions::default())
            .await
    }

    pub async fn get_paginated_with(
        &self,
        filter: &Filter<D>,
        pagination: Pagination,
        options: ReadOptions,
    ) -> RepositoryResult<Vec<D>> {
        let span = read_span::<D>("get_paginated", &options);
        span.in_scope(|| {
            tracing::trace!(
                offset = pagination.offset,
                limit = pagination.limit,
                "loading page"
            );
        });
        self.reader
            .get_all(filter, options.partition(), Some(pagination), options.token())
            .instrument(span)
            .await
    }
}

fn read_span<D: Document>(operation: &'static str, options: &ReadOptions) -> tracing::Span {
    tracing::debug_span!(
        "repository",
        operation,
        collection = D::COLLECTION,
        partition_key = options.partition().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::RecordingReader;
    use crate::repository::{
        FilterCondition, RepositoryError, RepositoryErrorKind, RepositoryOperation,
    };
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;
    use tracing_subscriber::fmt::format::FmtSpan;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestDocument {
        id: Uuid,
        some_content: String,
    }

    impl Document for TestDocument {
        type Key = Uuid;
        const COLLECTION: &'static str = "TestDocuments";

        fn id(&self) -> &Uuid {
            &self.id
        }
    }

    fn content_filter() -> Filter<TestDocument> {
        Filter::with(FilterCondition::eq("some_content", "SomeContent"))
    }

    fn repository(reader: RecordingReader) -> KeyedReadOnlyRepository<TestDocument, RecordingReader> {
        KeyedReadOnlyRepository::new(reader)
    }

    fn random_partition_key() -> String {
        Uuid::new_v4().to_string()
    }

    #[tokio::test]
    async fn test_count_with_filter_forwards_defaults() {
        let sut = repository(RecordingReader::new().returning_count(42));
        let filter = content_filter();

        let result = sut.count(&filter).await.unwrap();

        assert_eq!(result, 42);
        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, RepositoryOperation::Count);
        assert!(calls[0].is_for::<TestDocument>());
        assert_eq!(calls[0].filter::<TestDocument>(), filter);
        assert_eq!(calls[0].partition_key, None);
        assert!(!calls[0].cancellation.is_cancelled());
    }

    /// Log sink shared between the test and the subscriber's writer
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_count_with_partition_key_records_span() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let sut = repository(RecordingReader::new().returning_count(3));
        let result = sut
            .count_with(&content_filter(), ReadOptions::new().partition_key("shard-1"))
            .await
            .unwrap();

        assert_eq!(result, 3);
        let output = logs.contents().replace('"', "");
        assert!(output.contains("repository{"), "no repository span in: {output}");
        assert!(output.contains("operation=count"), "{output}");
        assert!(output.contains("collection=TestDocuments"), "{output}");
        assert!(output.contains("partition_key=shard-1"), "{output}");
    }

    #[tokio::test]
    async fn test_count_with_filter_and_cancellation_token() {
        let count = 1_234_567_890_123_u64;
        let sut = repository(RecordingReader::new().returning_count(count));
        let filter = content_filter();
        let token = CancellationToken::new();
        token.cancel();

        let result = sut
            .count_with(&filter, ReadOptions::new().cancellation(token.clone()))
            .await
            .unwrap();

        assert_eq!(result, count);
        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter::<TestDocument>(), filter);
        assert_eq!(calls[0].partition_key, None);
        assert!(calls[0].cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_count_with_filter_and_partition_key() {
        let sut = repository(RecordingReader::new().returning_count(9));
        let filter = content_filter();
        let partition_key = random_partition_key();

        let result = sut
            .count_with(&filter, ReadOptions::new().partition_key(partition_key.clone()))
            .await
            .unwrap();

        assert_eq!(result, 9);
        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter::<TestDocument>(), filter);
        assert_eq!(calls[0].partition_key, Some(partition_key));
        assert!(!calls[0].cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_count_with_filter_partition_key_and_cancellation_token() {
        let sut = repository(RecordingReader::new().returning_count(u64::MAX));
        let filter = content_filter();
        let partition_key = random_partition_key();
        let token = CancellationToken::new();
        token.cancel();

        let result = sut
            .count_with(
                &filter,
                ReadOptions::new()
                    .partition_key(partition_key.clone())
                    .cancellation(token),
            )
            .await
            .unwrap();

        assert_eq!(result, u64::MAX);
        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter::<TestDocument>(), filter);
        assert_eq!(calls[0].partition_key, Some(partition_key));
        assert!(calls[0].cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_count_returns_partition_specific_value() {
        let sut = repository(
            RecordingReader::new()
                .returning_count(1)
                .returning_count_for_partition("shard-1", 7),
        );

        let result = sut
            .count_with(&content_filter(), ReadOptions::new().partition_key("shard-1"))
            .await
            .unwrap();

        assert_eq!(result, 7);
    }

    #[tokio::test]
    async fn test_forwarded_token_is_the_callers_token() {
        let sut = repository(RecordingReader::new());
        let token = CancellationToken::new();

        sut.count_with(&content_filter(), ReadOptions::new().cancellation(token.clone()))
            .await
            .unwrap();

        let recorded = sut.reader().calls()[0].cancellation.clone();
        assert!(!recorded.is_cancelled());
        token.cancel();
        assert!(recorded.is_cancelled());
    }

    #[tokio::test]
    async fn test_default_tokens_are_independent_per_call() {
        let sut = repository(RecordingReader::new());

        sut.count(&content_filter()).await.unwrap();
        sut.count(&content_filter()).await.unwrap();

        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 2);
        calls[0].cancellation.cancel();
        assert!(!calls[1].cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_reader_error_propagates_unchanged() {
        let error = RepositoryError::storage_unavailable(RepositoryOperation::Count, "no route to host")
            .with_entity("TestDocument", "n/a");
        let sut = repository(RecordingReader::new().returning_count(5).failing_with(error.clone()));

        let result = sut.count(&content_filter()).await;

        assert_eq!(result.unwrap_err(), error);
        assert_eq!(sut.reader().call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_error_is_not_downgraded() {
        let error = RepositoryError::cancelled(RepositoryOperation::Count);
        let sut = repository(RecordingReader::new().failing_with(error));

        let result = sut.count(&content_filter()).await;

        assert_eq!(result.unwrap_err().kind, RepositoryErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_any_forwards_options() {
        let sut = repository(RecordingReader::new().returning_any(true));
        let token = CancellationToken::new();

        let result = sut
            .any_with(
                &content_filter(),
                ReadOptions::new().partition_key("p").cancellation(token),
            )
            .await
            .unwrap();

        assert!(result);
        let calls = sut.reader().calls_for(RepositoryOperation::Any);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].partition_key.as_deref(), Some("p"));
    }

    #[tokio::test]
    async fn test_get_by_id_forwards_key() {
        let document = TestDocument {
            id: Uuid::new_v4(),
            some_content: "SomeContent".to_string(),
        };
        let sut = repository(RecordingReader::new().returning_documents(&[document.clone()]));

        let result = sut.get_by_id(&document.id).await.unwrap();

        assert_eq!(result, Some(document.clone()));
        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, RepositoryOperation::GetById);
        assert_eq!(
            calls[0].id,
            Some(serde_json::to_value(document.id).unwrap())
        );
        assert_eq!(calls[0].partition_key, None);
    }

    #[tokio::test]
    async fn test_get_one_and_get_all() {
        let documents = vec![
            TestDocument {
                id: Uuid::new_v4(),
                some_content: "a".to_string(),
            },
            TestDocument {
                id: Uuid::new_v4(),
                some_content: "b".to_string(),
            },
        ];
        let sut = repository(RecordingReader::new().returning_documents(&documents));

        let one = sut.get_one(&content_filter()).await.unwrap();
        let all = sut.get_all(&content_filter()).await.unwrap();

        assert_eq!(one.as_ref(), documents.first());
        assert_eq!(all, documents);
        let get_all = sut.reader().calls_for(RepositoryOperation::GetAll);
        assert_eq!(get_all.len(), 1);
        assert_eq!(get_all[0].pagination, None);
    }

    #[tokio::test]
    async fn test_get_paginated_forwards_window() {
        let sut = repository(RecordingReader::new());
        let page = Pagination::page(2, 10);

        let result = sut
            .get_paginated_with(&content_filter(), page, ReadOptions::new().partition_key("eu"))
            .await
            .unwrap();

        assert!(result.is_empty());
        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, RepositoryOperation::GetAll);
        assert_eq!(calls[0].pagination, Some(page));
        assert_eq!(calls[0].partition_key.as_deref(), Some("eu"));
    }

    #[tokio::test]
    async fn test_every_operation_calls_reader_once() {
        let sut = repository(RecordingReader::new());
        let filter = content_filter();

        sut.count(&filter).await.unwrap();
        sut.any(&filter).await.unwrap();
        sut.get_by_id(&Uuid::new_v4()).await.unwrap();
        sut.get_one(&filter).await.unwrap();
        sut.get_all(&filter).await.unwrap();
        sut.get_paginated(&filter, Pagination::default()).await.unwrap();

        let calls = sut.reader().calls();
        assert_eq!(calls.len(), 6);
        assert!(calls.iter().all(|call| call.is_for::<TestDocument>()));
    }

    #[tokio::test]
    async fn test_clones_share_the_reader() {
        let sut = repository(RecordingReader::new());
        let clone = sut.clone();

        clone.count(&content_filter()).await.unwrap();

        assert!(Arc::ptr_eq(sut.reader(), clone.reader()));
        assert_eq!(sut.reader().call_count(), 1);
    }

    #[tokio::test]
    async fn test_repositories_over_one_shared_reader() {
        #[derive(Serialize, Deserialize)]
        struct Other {
            id: i64,
        }

        impl Document for Other {
            type Key = i64;
            const COLLECTION: &'static str = "Others";

            fn id(&self) -> &i64 {
                &self.id
            }
        }

        let reader = Arc::new(RecordingReader::new());
        let documents = KeyedReadOnlyRepository::<TestDocument, _>::from_shared(Arc::clone(&reader));
        let others = KeyedReadOnlyRepository::<Other, _>::from_shared(Arc::clone(&reader));

        documents.count(&Filter::all()).await.unwrap();
        others.count(&Filter::all()).await.unwrap();

        let calls = reader.calls();
        assert!(calls[0].is_for::<TestDocument>());
        assert!(calls[1].is_for::<Other>());
        assert_eq!(calls[1].key_type, std::any::type_name::<i64>());
    }
}
