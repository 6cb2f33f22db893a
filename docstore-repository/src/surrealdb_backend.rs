//! SurrealDB document reader
//!
//! Supports runtime protocol selection via URL scheme:
//! - `ws://` / `wss://` - WebSocket connections
//! - `http://` / `https://` - HTTP connections
//! - `mem://` - In-memory database (for testing)
//!
//! Each document type maps to a table named after its collection (prefixed
//! with the partition key when one is given). Filters become a parameterized
//! SurrealQL `WHERE` clause; values are always bound, never interpolated.
//! The field `id` addresses the record key, so documents are expected to be
//! stored under their own key (`CREATE type::thing($table, $key) CONTENT ...`).

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize};
use tokio_util::sync::CancellationToken;

use crate::config::SurrealDbConfig;
use crate::error::Result;
use crate::repository::{
    collection_name, Document, DocumentReader, Filter, FilterCondition, FilterOperator,
    FilterValue, Pagination, RepositoryError, RepositoryErrorKind, RepositoryOperation,
    RepositoryResult,
};

/// SurrealDB client type alias using the `Any` engine for runtime protocol selection
pub type SurrealClient = surrealdb::Surreal<surrealdb::engine::any::Any>;

type Bindings = BTreeMap<String, serde_json::Value>;

/// [`DocumentReader`] backed by a SurrealDB connection
#[derive(Clone)]
pub struct SurrealReader {
    client: SurrealClient,
}

impl std::fmt::Debug for SurrealReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealReader").finish_non_exhaustive()
    }
}

impl SurrealReader {
    /// Connect using the configuration, retrying with exponential backoff
    pub async fn connect(config: &SurrealDbConfig) -> Result<Self> {
        let client = create_client_with_retries(config, config.max_retries).await?;
        Ok(Self::from_client(client))
    }

    /// Wrap an already connected client
    ///
    /// The client must have its namespace and database selected.
    pub fn from_client(client: SurrealClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SurrealClient {
        &self.client
    }

    /// Run a statement, racing it against the caller's token
    async fn run<T, F>(
        &self,
        operation: RepositoryOperation,
        cancellation: &CancellationToken,
        query: F,
    ) -> RepositoryResult<T>
    where
        F: Future<Output = std::result::Result<T, surrealdb::Error>>,
    {
        tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                tracing::debug!(%operation, "query cancelled");
                Err(RepositoryError::cancelled(operation))
            }
            result = query => result.map_err(|e| map_surrealdb_error(operation, &e)),
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        operation: RepositoryOperation,
        statement: SelectStatement,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        tracing::trace!(%operation, sql = %statement.sql, "executing select");
        let SelectStatement { sql, bindings } = statement;
        self.run(operation, cancellation, async {
            let mut response = self.client.query(sql).bind(bindings).await?;
            response.take::<Vec<T>>(0)
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

impl DocumentReader for SurrealReader {
    async fn count<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<u64> {
        let operation = RepositoryOperation::Count;
        let statement = SelectStatement::build::<D>(
            operation,
            "count() AS count",
            filter.conditions(),
            partition_key,
            Tail::GroupAll,
        )?;

        let rows: Vec<CountRow> = self.select(operation, statement, cancellation).await?;
        // An empty table yields no group at all
        Ok(rows.first().map_or(0, |row| row.count))
    }

    async fn any<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<bool> {
        let operation = RepositoryOperation::Any;
        let statement = SelectStatement::build::<D>(
            operation,
            "VALUE true",
            filter.conditions(),
            partition_key,
            Tail::Window(Pagination::first_page(1)),
        )?;

        let rows: Vec<bool> = self.select(operation, statement, cancellation).await?;
        Ok(!rows.is_empty())
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
        let condition = FilterCondition::new(D::ID_FIELD, FilterOperator::Equal, json_to_filter_value(key));
        let statement = SelectStatement::build::<D>(
            operation,
            DOCUMENT_PROJECTION,
            std::slice::from_ref(&condition),
            partition_key,
            Tail::Window(Pagination::first_page(1)),
        )?;

        let documents: Vec<D> = self.select(operation, statement, cancellation).await?;
        Ok(documents.into_iter().next())
    }

    async fn get_one<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Option<D>> {
        let operation = RepositoryOperation::GetOne;
        let statement = SelectStatement::build::<D>(
            operation,
            DOCUMENT_PROJECTION,
            filter.conditions(),
            partition_key,
            Tail::Window(Pagination::first_page(1)),
        )?;

        let documents: Vec<D> = self.select(operation, statement, cancellation).await?;
        Ok(documents.into_iter().next())
    }

    async fn get_all<D: Document>(
        &self,
        filter: &Filter<D>,
        partition_key: Option<&str>,
        pagination: Option<Pagination>,
        cancellation: &CancellationToken,
    ) -> RepositoryResult<Vec<D>> {
        let operation = RepositoryOperation::GetAll;
        let tail = pagination.map_or(Tail::None, Tail::Window);
        let statement = SelectStatement::build::<D>(
            operation,
            DOCUMENT_PROJECTION,
            filter.conditions(),
            partition_key,
            tail,
        )?;

        self.select(operation, statement, cancellation).await
    }
}

/// Record key exposed as a plain value so it deserializes into `D::Key`
const DOCUMENT_PROJECTION: &str = "*, record::id(id) AS id";

enum Tail {
    None,
    GroupAll,
    Window(Pagination),
}

#[derive(Debug, Clone, PartialEq)]
struct SelectStatement {
    sql: String,
    bindings: Bindings,
}

impl SelectStatement {
    fn build<D: Document>(
        operation: RepositoryOperation,
        projection: &str,
        conditions: &[FilterCondition],
        partition_key: Option<&str>,
        tail: Tail,
    ) -> RepositoryResult<Self> {
        let mut bindings = Bindings::new();
        bindings.insert(
            "table".to_string(),
            serde_json::Value::from(collection_name::<D>(partition_key)),
        );

        let mut sql = format!("SELECT {} FROM type::table($table)", projection);

        let clauses = conditions
            .iter()
            .enumerate()
            .map(|(index, condition)| condition_clause(operation, index, condition, &mut bindings))
            .collect::<RepositoryResult<Vec<_>>>()?;
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        match tail {
            Tail::None => {}
            Tail::GroupAll => sql.push_str(" GROUP ALL"),
            Tail::Window(pagination) => {
                sql.push_str(&format!(
                    " LIMIT {} START {}",
                    pagination.limit, pagination.offset
                ));
            }
        }

        Ok(Self { sql, bindings })
    }
}

fn condition_clause(
    operation: RepositoryOperation,
    index: usize,
    condition: &FilterCondition,
    bindings: &mut Bindings,
) -> RepositoryResult<String> {
    let field = field_expression(operation, &condition.field)?;
    let param = format!("p{}", index);
    let malformed = || {
        RepositoryError::malformed_filter(operation, format!("'{}' cannot be translated", condition))
    };
    let is_list = matches!(
        condition.value,
        FilterValue::StringList(_) | FilterValue::IntegerList(_)
    );

    let comparison = match condition.operator {
        FilterOperator::IsNull => return Ok(null_clause(&field)),
        FilterOperator::IsNotNull => return Ok(not_null_clause(&field)),
        FilterOperator::Equal | FilterOperator::NotEqual if is_list => return Err(malformed()),
        FilterOperator::Equal if condition.value == FilterValue::Null => {
            return Ok(null_clause(&field))
        }
        FilterOperator::NotEqual if condition.value == FilterValue::Null => {
            return Ok(not_null_clause(&field))
        }
        FilterOperator::Equal => format!("{} = ${}", field, param),
        FilterOperator::NotEqual => format!("{} != ${}", field, param),
        FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEqual
        | FilterOperator::LessThan
        | FilterOperator::LessThanOrEqual
            if is_list || condition.value == FilterValue::Null =>
        {
            return Err(malformed())
        }
        FilterOperator::GreaterThan => format!("{} > ${}", field, param),
        FilterOperator::GreaterThanOrEqual => format!("{} >= ${}", field, param),
        FilterOperator::LessThan => format!("{} < ${}", field, param),
        FilterOperator::LessThanOrEqual => format!("{} <= ${}", field, param),
        FilterOperator::Like => {
            let FilterValue::String(pattern) = &condition.value else {
                return Err(malformed());
            };
            bindings.insert(param.clone(), serde_json::Value::from(like_to_regex(pattern)));
            return Ok(format!("string::matches({}, ${})", field, param));
        }
        FilterOperator::In if !is_list => return Err(malformed()),
        FilterOperator::In => format!("{} INSIDE ${}", field, param),
    };

    bindings.insert(param, condition.value.to_json());
    Ok(comparison)
}

fn null_clause(field: &str) -> String {
    format!("({} = NONE OR {} = NULL)", field, field)
}

fn not_null_clause(field: &str) -> String {
    format!("({} != NONE AND {} != NULL)", field, field)
}

/// Validate a dotted field path and map `id` onto the record key
fn field_expression(operation: RepositoryOperation, field: &str) -> RepositoryResult<String> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if !valid {
        return Err(RepositoryError::malformed_filter(
            operation,
            format!("'{}' is not a valid field name", field),
        ));
    }

    if field == "id" {
        Ok("record::id(id)".to_string())
    } else {
        Ok(field.to_string())
    }
}

/// Translate a `LIKE` pattern into an anchored regular expression
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex.push('$');
    regex
}

fn json_to_filter_value(value: serde_json::Value) -> FilterValue {
    match value {
        serde_json::Value::String(s) => FilterValue::String(s),
        serde_json::Value::Bool(b) => FilterValue::Boolean(b),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => FilterValue::Integer(i),
            (None, Some(u)) => FilterValue::Unsigned(u),
            (None, None) => FilterValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        other => FilterValue::String(other.to_string()),
    }
}

/// Map a driver error onto a repository error kind
fn map_surrealdb_error(operation: RepositoryOperation, err: &surrealdb::Error) -> RepositoryError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    let kind = if lower.contains("auth")
        || lower.contains("credentials")
        || lower.contains("signin")
        || lower.contains("permission")
        || lower.contains("not allowed")
    {
        RepositoryErrorKind::AuthorizationDenied
    } else if lower.contains("connect")
        || lower.contains("network")
        || lower.contains("dns")
        || lower.contains("refused")
    {
        RepositoryErrorKind::StorageUnavailable
    } else if lower.contains("timeout") || lower.contains("timed out") {
        RepositoryErrorKind::Timeout
    } else if lower.contains("deserializ") || lower.contains("serializ") {
        RepositoryErrorKind::SerializationError
    } else {
        RepositoryErrorKind::DatabaseError
    };

    RepositoryError::new(operation, kind, message)
}

/// Create a SurrealDB client with configurable retries
///
/// Uses exponential backoff strategy for retries
async fn create_client_with_retries(
    config: &SurrealDbConfig,
    max_retries: u32,
) -> Result<SurrealClient> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_client(config).await {
            Ok(client) => {
                if attempt > 0 {
                    tracing::info!(
                        "SurrealDB connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "SurrealDB connected: url={}, ns={}, db={}",
                        sanitize_url(&config.url),
                        config.namespace,
                        config.database
                    );
                }
                return Ok(client);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries || !e.is_retriable() {
                    tracing::error!(
                        "Failed to connect to SurrealDB after {} attempt(s): {}",
                        attempt,
                        e
                    );
                    return Err(e.into());
                }

                let delay = backoff_delay(base_delay, attempt);

                tracing::warn!(
                    "SurrealDB connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Exponential backoff for the given 1-based attempt, saturating at `Duration::MAX`
fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay
        .checked_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
        .unwrap_or(Duration::MAX)
}

/// Attempt to create a SurrealDB client (single try)
async fn try_create_client(config: &SurrealDbConfig) -> RepositoryResult<SurrealClient> {
    let operation = RepositoryOperation::Connect;
    let url_safe = sanitize_url(&config.url);
    tracing::debug!("Connecting to SurrealDB: {}", url_safe);

    let client = surrealdb::engine::any::connect(&config.url)
        .await
        .map_err(|e| {
            let error = map_surrealdb_error(operation, &e);
            RepositoryError {
                // A failed connect is never a query-level failure
                kind: match error.kind {
                    RepositoryErrorKind::DatabaseError => RepositoryErrorKind::StorageUnavailable,
                    kind => kind,
                },
                message: format!("Failed to connect to SurrealDB at '{}': {}", url_safe, e),
                ..error
            }
        })?;

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client
            .signin(surrealdb::opt::auth::Root { username, password })
            .await
            .map_err(|e| {
                RepositoryError::authorization_denied(
                    operation,
                    format!("Failed to authenticate with SurrealDB at '{}': {}", url_safe, e),
                )
            })?;
    }

    client
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| {
            let error = map_surrealdb_error(operation, &e);
            RepositoryError {
                message: format!(
                    "Failed to select namespace '{}' / database '{}' on SurrealDB at '{}': {}",
                    config.namespace, config.database, url_safe, e
                ),
                ..error
            }
        })?;

    Ok(client)
}

/// Sanitize connection URL for safe logging (remove credentials if present)
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..=scheme_end + 2];
            let after_at = &url[at_pos..];
            return format!("{}***{}", scheme, after_at);
        }
    }
    url.to_string()
}
