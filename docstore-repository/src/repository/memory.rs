//! In-memory document reader
//!
//! [`InMemoryReader`] keeps serialized documents in a `DashMap` keyed by the
//! resolved collection name (see [`collection_name`]) and evaluates filters
//! against the JSON form of each document. Documents keep their insertion
//! order, so `get_one` and paginated reads are deterministic.
//!
//! # Example
//!
//! ```rust
//! # use docstore_repository::repository::{
//! #     Document, Filter, FilterCondition, InMemoryReader, KeyedReadOnlyRepository,
//! # };
//! # use serde::{Deserialize, Serialize};
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
//! # tokio_test_block(async {
//! let reader = InMemoryReader::new();
//! reader.insert(&Order { id: "o1".into(), status: "open".into() }, Some("eu")).unwrap();
//!
//! let orders = KeyedReadOnlyRepository::<Order, _>::new(reader);
//! let open = Filter::with(FilterCondition::eq("status", "open"));
//! assert_eq!(orders.count(&open).await.unwrap(), 0);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::cmp::Ordering;
use std::ops::ControlFlow;

use dashmap::DashMap;
use serde_json::{Number, Value};
use tokio_util::sync::CancellationToken;

use super::document::{collection_name, Document};
use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::filter::{Filter, FilterCondition, FilterOperator, FilterValue};
use super::pagination::Pagination;
use super::traits::{DocumentReader, RepositoryResult};

/// Process-local document store implementing [`DocumentReader`]
#[derive(Debug, Default)]
pub struct InMemoryReader {
    collections: DashMap<String, Vec<Value>>,
}

impl InMemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document, replacing any document with the same key
    pub fn insert<D: Document>(
        &self,
        document: &D,
        partition_key: Option<&str>,
    ) -> RepositoryResult<()> {
        let value = serialize_document(document)?;
        let collection = collection_name::<D>(partition_key);
        let mut documents = self.collections.entry(collection.clone()).or_default();
        upsert::<D>(&mut documents, value);

        tracing::trace!(collection = %collection, "document stored");
        Ok(())
    }

    /// Store several documents in one partition
    pub fn insert_many<'a, D, I>(&self, documents: I, partition_key: Option<&str>) -> RepositoryResult<()>
    where
        D: Document,
        I: IntoIterator<Item = &'a D>,
    {
        let values = documents
            .into_iter()
            .map(serialize_document)
            .collect::<RepositoryResult<Vec<_>>>()?;
        let collection = collection_name::<D>(partition_key);
        let stored = values.len();

        let mut existing = self.collections.entry(collection.clone()).or_default();
        for value in values {
            upsert::<D>(&mut existing, value);
        }

        tracing::debug!(collection = %collection, stored, "documents stored");
        Ok(())
    }

    /// Number of documents in a collection, across all keys
    pub fn len<D: Document>(&self, partition_key: Option<&str>) -> usize {
        self.collections
            .get(&collection_name::<D>(partition_key))
            .map_or(0, |documents| documents.len())
    }

    pub fn is_empty<D: Document>(&self, partition_key: Option<&str>) -> bool {
        self.len::<D>(partition_key) == 0
    }

    /// Drop every stored document
    pub fn clear(&self) {
        self.collections.clear();
    }

    /// Visit the documents matching `filter` in insertion order
    ///
    /// The token is checked before the scan and again before each document.
    fn scan<D: Document>(
        &self,
        operation: RepositoryOperation,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
        mut visit: impl FnMut(&Value) -> ControlFlow<()>,
    ) -> RepositoryResult<()> {
        ensure_not_cancelled(operation, cancellation)?;
        validate(operation, filter.conditions())?;

        let collection = collection_name::<D>(partition_key);
        let Some(documents) = self.collections.get(&collection) else {
            tracing::trace!(collection = %collection, "collection is empty");
            return Ok(());
        };

        for document in documents.iter() {
            ensure_not_cancelled(operation, cancellation)?;
            if matches_all(filter.conditions(), document) && visit(document).is_break() {
                break;
            }
        }
        Ok(())
    }
}

impl DocumentReader for InMemoryReader {
    async fn count<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<u64> {
        let mut count = 0_u64;
        self.scan(
            RepositoryOperation::Count,
            filter,
            partition_key,
            cancellation,
            |_| {
                count += 1;
                ControlFlow::Continue(())
            },
        )?;
        Ok(count)
    }

    async fn any<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<bool> {
        let mut found = false;
        self.scan(
            RepositoryOperation::Any,
            filter,
            partition_key,
            cancellation,
            |_| {
                found = true;
                ControlFlow::Break(())
            },
        )?;
        Ok(found)
    }

    async fn get_by_id<D: Document>(
        &self,
        id: &D::Key,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Option<D>> {
        let operation = RepositoryOperation::GetById;
        let key = serde_json::to_value(id)
            .map_err(|e| RepositoryError::serialization_error(operation, e.to_string()))?;

        let mut found = None;
        self.scan(
            operation,
            &Filter::<D>::all(),
            partition_key,
            cancellation,
            |document| match lookup(document, D::ID_FIELD) {
                Some(value) if json_eq(value, &key) => {
                    found = Some(document.clone());
                    ControlFlow::Break(())
                }
                _ => ControlFlow::Continue(()),
            },
        )?;

        found
            .map(|value| {
                decode(operation, value)
                    .map_err(|e| e.with_entity(D::COLLECTION, key_label(&key)))
            })
            .transpose()
    }

    async fn get_one<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Option<D>> {
        let operation = RepositoryOperation::GetOne;
        let mut found = None;
        self.scan(operation, filter, partition_key, cancellation, |document| {
            found = Some(document.clone());
            ControlFlow::Break(())
        })?;

        found.map(|value| decode(operation, value)).transpose()
    }

    async fn get_all<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        pagination: Option<Pagination>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Vec<D>> {
        let operation = RepositoryOperation::GetAll;
        let mut matched = Vec::new();
        self.scan(operation, filter, partition_key, cancellation, |document| {
            matched.push(document.clone());
            ControlFlow::Continue(())
        })?;

        let page: Vec<Value> = match pagination {
            Some(pagination) => pagination.apply(matched.into_iter()).collect(),
            None => matched,
        };
        page.into_iter().map(|value| decode(operation, value)).collect()
    }
}

fn ensure_not_cancelled(
    operation: RepositoryOperation,
    cancellation: &CancellationToken,
) -> RepositoryResult<()> {
    if cancellation.is_cancelled() {
        tracing::debug!(%operation, "read cancelled");
        return Err(RepositoryError::cancelled(operation));
    }
    Ok(())
}

fn serialize_document<D: Document>(document: &D) -> RepositoryResult<Value> {
    let value = serde_json::to_value(document).map_err(|e| {
        RepositoryError::serialization_error(RepositoryOperation::Insert, e.to_string())
    })?;

    if lookup(&value, D::ID_FIELD).is_none() {
        return Err(RepositoryError::new(
            RepositoryOperation::Insert,
            RepositoryErrorKind::Other,
            format!(
                "serialized {} document has no '{}' field",
                D::COLLECTION,
                D::ID_FIELD
            ),
        ));
    }
    Ok(value)
}

fn upsert<D: Document>(documents: &mut Vec<Value>, value: Value) {
    let key = lookup(&value, D::ID_FIELD).cloned();
    let existing = documents.iter_mut().find(|document| {
        matches!(
            (lookup(document, D::ID_FIELD), key.as_ref()),
            (Some(current), Some(key)) if json_eq(current, key)
        )
    });

    match existing {
        Some(slot) => *slot = value,
        None => documents.push(value),
    }
}

fn decode<D: Document>(operation: RepositoryOperation, value: Value) -> RepositoryResult<D> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::serialization_error(operation, e.to_string()))
}

/// Key rendered for error context, without JSON quoting for strings
fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reject conditions whose value cannot be used with their operator
fn validate(operation: RepositoryOperation, conditions: &[FilterCondition]) -> RepositoryResult<()> {
    for condition in conditions {
        let valid = match condition.operator {
            FilterOperator::Equal | FilterOperator::NotEqual => !is_list(&condition.value),
            FilterOperator::GreaterThan
            | FilterOperator::GreaterThanOrEqual
            | FilterOperator::LessThan
            | FilterOperator::LessThanOrEqual => {
                !is_list(&condition.value) && condition.value != FilterValue::Null
            }
            FilterOperator::Like => matches!(condition.value, FilterValue::String(_)),
            FilterOperator::In => is_list(&condition.value),
            FilterOperator::IsNull | FilterOperator::IsNotNull => true,
        };

        if !valid {
            return Err(RepositoryError::malformed_filter(
                operation,
                format!("'{}' cannot be evaluated", condition),
            ));
        }
    }
    Ok(())
}

fn is_list(value: &FilterValue) -> bool {
    matches!(value, FilterValue::StringList(_) | FilterValue::IntegerList(_))
}

fn matches_all(conditions: &[FilterCondition], document: &Value) -> bool {
    conditions
        .iter()
        .all(|condition| matches_condition(condition, document))
}

fn matches_condition(condition: &FilterCondition, document: &Value) -> bool {
    let actual = lookup(document, &condition.field).filter(|value| !value.is_null());
    let expected = condition.value.to_json();

    match condition.operator {
        FilterOperator::IsNull => actual.is_none(),
        FilterOperator::IsNotNull => actual.is_some(),
        FilterOperator::Equal => json_eq(actual.unwrap_or(&Value::Null), &expected),
        FilterOperator::NotEqual => !json_eq(actual.unwrap_or(&Value::Null), &expected),
        FilterOperator::GreaterThan => compare(actual, &expected) == Some(Ordering::Greater),
        FilterOperator::GreaterThanOrEqual => matches!(
            compare(actual, &expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::LessThan => compare(actual, &expected) == Some(Ordering::Less),
        FilterOperator::LessThanOrEqual => matches!(
            compare(actual, &expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::Like => match (actual, &expected) {
            (Some(Value::String(text)), Value::String(pattern)) => like_matches(text, pattern),
            _ => false,
        },
        FilterOperator::In => match (actual, &expected) {
            (Some(value), Value::Array(candidates)) => {
                candidates.iter().any(|candidate| json_eq(value, candidate))
            }
            _ => false,
        },
    }
}

/// Resolve a dotted field path inside a document
fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |value, segment| value.get(segment))
}

/// JSON equality where numbers compare by numeric value
fn json_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => left == right,
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Integers compare exactly; `f64` is used only when one side is a float
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if a.is_f64() || b.is_f64() {
        return a.as_f64()?.partial_cmp(&b.as_f64()?);
    }
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return Some(a.cmp(&b));
    }
    // One side is negative, the other above i64::MAX
    Some(if a.as_i64().is_some() {
        Ordering::Less
    } else {
        Ordering::Greater
    })
}

/// SQL `LIKE` matching: `%` matches any run of characters, `_` exactly one
fn like_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    // Position of the last `%` and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    p = star + 1;
                    t = absorbed + 1;
                    backtrack = Some((star, absorbed + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
