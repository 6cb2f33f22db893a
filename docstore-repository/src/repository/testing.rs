//! Recording reader test double
//!
//! [`RecordingReader`] returns scripted results and records the arguments of
//! every call, so tests can check what a repository forwarded to its reader.
//!
//! # Example
//!
//! ```rust,ignore
//! let reader = RecordingReader::new().returning_count(42);
//! let repository = KeyedReadOnlyRepository::<Order, _>::new(reader);
//!
//! assert_eq!(repository.count(&filter).await?, 42);
//!
//! let calls = repository.reader().calls();
//! assert_eq!(calls.len(), 1);
//! assert_eq!(calls[0].partition_key, None);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::document::Document;
use super::error::{RepositoryError, RepositoryOperation};
use super::filter::{Filter, FilterCondition};
use super::pagination::Pagination;
use super::traits::{DocumentReader, RepositoryResult};

/// One call received by a [`RecordingReader`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: RepositoryOperation,
    /// `std::any::type_name` of the document type
    pub document_type: &'static str,
    /// `std::any::type_name` of the key type
    pub key_type: &'static str,
    /// Filter conditions, empty for `get_by_id`
    pub conditions: Vec<FilterCondition>,
    /// Serialized key for `get_by_id`
    pub id: Option<serde_json::Value>,
    pub partition_key: Option<String>,
    /// Handle sharing state with the token the caller passed in
    pub cancellation: CancellationToken,
    pub pagination: Option<Pagination>,
}

impl RecordedCall {
    /// Whether the call was made for document type `D` and its key type
    pub fn is_for<D: Document>(&self) -> bool {
        self.document_type == std::any::type_name::<D>()
            && self.key_type == std::any::type_name::<D::Key>()
    }

    /// Rebuild the forwarded filter for comparison
    pub fn filter<D>(&self) -> Filter<D> {
        Filter::new(self.conditions.clone())
    }
}

/// Scripted [`DocumentReader`] that records every call
#[derive(Debug, Default)]
pub struct RecordingReader {
    count: u64,
    partition_counts: HashMap<String, u64>,
    any: bool,
    documents: Vec<serde_json::Value>,
    failure: Option<RepositoryError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count returned for any filter and partition without an override
    #[must_use]
    pub fn returning_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Count returned when the partition key equals `partition_key`
    #[must_use]
    pub fn returning_count_for_partition(
        mut self,
        partition_key: impl Into<String>,
        count: u64,
    ) -> Self {
        self.partition_counts.insert(partition_key.into(), count);
        self
    }

    /// Result of `any`
    #[must_use]
    pub fn returning_any(mut self, any: bool) -> Self {
        self.any = any;
        self
    }

    /// Documents returned by the loading operations
    ///
    /// `get_by_id` and `get_one` return the first document, `get_all` returns
    /// all of them without applying pagination.
    ///
    /// # Panics
    ///
    /// Panics if a document cannot be serialized to JSON.
    #[must_use]
    pub fn returning_documents<T: Serialize>(mut self, documents: &[T]) -> Self {
        self.documents = documents
            .iter()
            .map(|document| {
                serde_json::to_value(document).expect("scripted document must serialize")
            })
            .collect();
        self
    }

    /// Fail every call with exactly this error
    #[must_use]
    pub fn failing_with(mut self, error: RepositoryError) -> Self {
        self.failure = Some(error);
        self
    }

    /// All calls received so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    /// Calls received for one operation
    pub fn calls_for(&self, operation: RepositoryOperation) -> Vec<RecordedCall> {
        self.lock_calls()
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    pub fn reset(&self) {
        self.lock_calls().clear();
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        // A panicking test thread must not hide the calls from other assertions.
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record<D: Document>(
        &self,
        operation: RepositoryOperation,
        conditions: &[FilterCondition],
        id: Option<serde_json::Value>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
        pagination: Option<Pagination>,
    ) -> RepositoryResult<()> {
        self.lock_calls().push(RecordedCall {
            operation,
            document_type: std::any::type_name::<D>(),
            key_type: std::any::type_name::<D::Key>(),
            conditions: conditions.to_vec(),
            id,
            partition_key: partition_key.map(str::to_string),
            cancellation: cancellation.clone(),
            pagination,
        });

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn decode<D: Document>(
        &self,
        operation: RepositoryOperation,
        value: &serde_json::Value,
    ) -> RepositoryResult<D> {
        serde_json::from_value(value.clone())
            .map_err(|e| RepositoryError::serialization_error(operation, e.to_string()))
    }
}

impl DocumentReader for RecordingReader {
    async fn count<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<u64> {
        self.record::<D>(
            RepositoryOperation::Count,
            filter.conditions(),
            None,
            partition_key,
            cancellation,
            None,
        )?;

        let count = partition_key
            .and_then(|partition| self.partition_counts.get(partition).copied())
            .unwrap_or(self.count);
        Ok(count)
    }

    async fn any<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<bool> {
        self.record::<D>(
            RepositoryOperation::Any,
            filter.conditions(),
            None,
            partition_key,
            cancellation,
            None,
        )?;
        Ok(self.any)
    }

    async fn get_by_id<D: Document>(
        &self,
        id: &D::Key,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Option<D>> {
        let id = serde_json::to_value(id).map_err(|e| {
            RepositoryError::serialization_error(RepositoryOperation::GetById, e.to_string())
        })?;
        self.record::<D>(
            RepositoryOperation::GetById,
            &[],
            Some(id),
            partition_key,
            cancellation,
            None,
        )?;

        self.documents
            .first()
            .map(|value| self.decode(RepositoryOperation::GetById, value))
            .transpose()
    }

    async fn get_one<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Option<D>> {
        self.record::<D>(
            RepositoryOperation::GetOne,
            filter.conditions(),
            None,
            partition_key,
            cancellation,
            None,
        )?;

        self.documents
            .first()
            .map(|value| self.decode(RepositoryOperation::GetOne, value))
            .transpose()
    }

    async fn get_all<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        pagination: Option<Pagination>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Vec<D>> {
        self.record::<D>(
            RepositoryOperation::GetAll,
            filter.conditions(),
            None,
            partition_key,
            cancellation,
            pagination,
        )?;

        self.documents
            .iter()
            .map(|value| self.decode(RepositoryOperation::GetAll, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        id: String,
        title: String,
    }

    impl Document for Ticket {
        type Key = String;
        const COLLECTION: &'static str = "Tickets";

        fn id(&self) -> &String {
            &self.id
        }
    }

    #[tokio::test]
    async fn test_records_count_arguments() {
        let reader = RecordingReader::new().returning_count(3);
        let token = CancellationToken::new();
        let filter = Filter::<Ticket>::with(FilterCondition::eq("title", "x"));

        let count = reader.count(&filter, Some("p1"), &token).await.unwrap();
        assert_eq!(count, 3);

        let calls = reader.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, RepositoryOperation::Count);
        assert!(calls[0].is_for::<Ticket>());
        assert_eq!(calls[0].filter::<Ticket>(), filter);
        assert_eq!(calls[0].partition_key.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_partition_count_override() {
        let reader = RecordingReader::new()
            .returning_count(1)
            .returning_count_for_partition("shard-1", 7);
        let token = CancellationToken::new();
        let filter = Filter::<Ticket>::all();

        assert_eq!(reader.count(&filter, Some("shard-1"), &token).await.unwrap(), 7);
        assert_eq!(reader.count(&filter, Some("shard-2"), &token).await.unwrap(), 1);
        assert_eq!(reader.count(&filter, None, &token).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_returned_after_recording() {
        let error = RepositoryError::authorization_denied(RepositoryOperation::Count, "no access");
        let reader = RecordingReader::new().failing_with(error.clone());
        let token = CancellationToken::new();

        let result = reader.count(&Filter::<Ticket>::all(), None, &token).await;
        assert_eq!(result.unwrap_err(), error);
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_documents() {
        let tickets = vec![
            Ticket {
                id: "t1".into(),
                title: "first".into(),
            },
            Ticket {
                id: "t2".into(),
                title: "second".into(),
            },
        ];
        let reader = RecordingReader::new().returning_documents(&tickets);
        let token = CancellationToken::new();

        let one = reader
            .get_by_id::<Ticket>(&"t1".to_string(), None, &token)
            .await
            .unwrap();
        assert_eq!(one, Some(tickets[0].clone()));

        let all = reader
            .get_all(&Filter::<Ticket>::all(), None, Some(Pagination::first_page(1)), &token)
            .await
            .unwrap();
        assert_eq!(all, tickets);

        let by_id = reader.calls_for(RepositoryOperation::GetById);
        assert_eq!(by_id[0].id, Some(serde_json::json!("t1")));
        let get_all = reader.calls_for(RepositoryOperation::GetAll);
        assert_eq!(get_all[0].pagination, Some(Pagination::first_page(1)));
    }

    #[tokio::test]
    async fn test_undecodable_document_is_serialization_error() {
        let reader = RecordingReader::new().returning_documents(&[serde_json::json!({"id": 5})]);
        let token = CancellationToken::new();

        let error = reader
            .get_one(&Filter::<Ticket>::all(), None, &token)
            .await
            .unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::SerializationError);
    }

    #[tokio::test]
    async fn test_reset_clears_calls() {
        let reader = RecordingReader::new().returning_any(true);
        let token = CancellationToken::new();
        assert!(reader.any(&Filter::<Ticket>::all(), None, &token).await.unwrap());
        reader.reset();
        assert_eq!(reader.call_count(), 0);
    }
}
