//! Filter predicates over document types
//!
//! A [`Filter`] is a conjunction of [`FilterCondition`]s typed by the document
//! it applies to. The repository facade treats it as opaque and hands it to the
//! reader unchanged; each reader decides how to evaluate it against its store.
//!
//! # Example
//!
//! ```rust
//! use docstore_repository::repository::{Document, Filter, FilterCondition};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Order {
//!     id: String,
//!     status: String,
//!     total: i64,
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
//! let filter = Filter::<Order>::with(FilterCondition::eq("status", "open"))
//!     .and(FilterCondition::gte("total", 100_i64));
//! assert_eq!(filter.conditions().len(), 2);
//! ```

use std::fmt;
use std::marker::PhantomData;

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching with `%` and `_` wildcards (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is missing or null (IS NULL)
    IsNull,
    /// Value is present and not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A value that can be used in filter conditions
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// Unsigned 64-bit integer value, for keys above `i64::MAX`
    Unsigned(u64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN operator)
    StringList(Vec<String>),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
    /// Null value (for IS NULL / IS NOT NULL)
    Null,
}

impl FilterValue {
    /// JSON form of the value, as it appears in a serialized document
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::from(s.as_str()),
            Self::Integer(n) => serde_json::Value::from(*n),
            Self::Unsigned(n) => serde_json::Value::from(*n),
            Self::Float(n) => serde_json::Value::from(*n),
            Self::Boolean(b) => serde_json::Value::from(*b),
            Self::StringList(list) => serde_json::Value::from(list.clone()),
            Self::IntegerList(list) => serde_json::Value::from(list.clone()),
            Self::Null => serde_json::Value::Null,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u64> for FilterValue {
    fn from(n: u64) -> Self {
        Self::Unsigned(n)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

/// A single condition on a document field
///
/// Field names may address nested values with dots (`"address.city"`).
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Create a not-equal filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Create a greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Create a greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Create a less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Create a less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Create a LIKE pattern filter (`%` matches any run, `_` one character)
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// Create an IN list filter for strings
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// Create an IN list filter for integers
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// Create an IS NULL filter
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// Create an IS NOT NULL filter
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            FilterOperator::IsNull | FilterOperator::IsNotNull => {
                write!(f, "{} {}", self.field, self.operator)
            }
            _ => write!(f, "{} {} {}", self.field, self.operator, self.value.to_json()),
        }
    }
}

/// Predicate over documents of type `D`
///
/// An empty filter matches every document. Conditions are combined with AND.
pub struct Filter<D> {
    conditions: Vec<FilterCondition>,
    _document: PhantomData<fn() -> D>,
}

impl<D> Filter<D> {
    /// A filter matching every document
    pub fn all() -> Self {
        Self::new(Vec::new())
    }

    /// Build a filter from a list of conditions
    pub fn new(conditions: Vec<FilterCondition>) -> Self {
        Self {
            conditions,
            _document: PhantomData,
        }
    }

    /// Build a filter from a single condition
    pub fn with(condition: FilterCondition) -> Self {
        Self::new(vec![condition])
    }

    /// Add another condition that must also hold
    #[must_use]
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// The conditions making up this filter
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    /// Whether this filter matches every document
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn into_conditions(self) -> Vec<FilterCondition> {
        self.conditions
    }
}

// Manual impls: `D` itself never needs to be Clone/Debug/PartialEq.
impl<D> Clone for Filter<D> {
    fn clone(&self) -> Self {
        Self::new(self.conditions.clone())
    }
}

impl<D> fmt::Debug for Filter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("document", &std::any::type_name::<D>())
            .field("conditions", &self.conditions)
            .finish()
    }
}

impl<D> PartialEq for Filter<D> {
    fn eq(&self, other: &Self) -> bool {
        self.conditions == other.conditions
    }
}

impl<D> Default for Filter<D> {
    fn default() -> Self {
        Self::all()
    }
}

impl<D> fmt::Display for Filter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "*");
        }
        for (index, condition) in self.conditions.iter().enumerate() {
            if index > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}

impl<D> From<FilterCondition> for Filter<D> {
    fn from(condition: FilterCondition) -> Self {
        Self::with(condition)
    }
}

impl<D> FromIterator<FilterCondition> for Filter<D> {
    fn from_iter<I: IntoIterator<Item = FilterCondition>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
