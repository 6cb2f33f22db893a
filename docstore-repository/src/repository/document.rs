//! Document trait and collection naming

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// A keyed document stored in a collection
///
/// The key type is fixed by the document type, so a repository over `D`
/// always queries its reader with `D` and `D::Key` together.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type of the document's primary key
    type Key: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Name of the collection holding documents of this type
    const COLLECTION: &'static str;

    /// Name of the serialized field that holds the key
    const ID_FIELD: &'static str = "id";

    /// The document's primary key
    fn id(&self) -> &Self::Key;
}

/// Resolve the physical collection name for `D` within an optional partition
///
/// Partitioned documents live in `"{partition_key}-{collection}"`. An empty
/// partition key is the same as no partition key.
///
/// # Example
///
/// ```rust
/// use docstore_repository::repository::{partitioned_collection_name};
///
/// assert_eq!(partitioned_collection_name("Orders", None), "Orders");
/// assert_eq!(partitioned_collection_name("Orders", Some("")), "Orders");
/// assert_eq!(partitioned_collection_name("Orders", Some("eu")), "eu-Orders");
/// ```
pub fn partitioned_collection_name(collection: &str, partition_key: Option<&str>) -> String {
    match partition_key {
        Some(partition) if !partition.is_empty() => format!("{}-{}", partition, collection),
        _ => collection.to_string(),
    }
}

/// Resolve the physical collection name for document type `D`
pub fn collection_name<D: Document>(partition_key: Option<&str>) -> String {
    partitioned_collection_name(D::COLLECTION, partition_key)
}
