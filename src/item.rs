//! Items, cursors and write requests.
//!
//! An [`Item`] is the raw DynamoDB attribute map. The migration engine never looks inside it;
//! filters and transforms that prefer `serde` types can go through [`from_item`] and
//! [`to_item`].

use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;

use crate::error::Result;

/// An opaque keyed record as stored in the table
pub type Item = HashMap<String, AttributeValue>;

/// Continuation cursor returned by a page read.
///
/// Wraps the table's `LastEvaluatedKey`. A cursor is consumed by the next read, which is how
/// the scan loop guarantees it is handed over verbatim and never reused.
#[must_use = "cursor should be used for pagination to fetch the next page"]
#[derive(Clone, Debug, PartialEq)]
pub struct Cursor(Item);

impl Cursor {
    /// Build a cursor from a `LastEvaluatedKey`, e.g. one persisted by an earlier run
    pub fn new(last_evaluated_key: Item) -> Self {
        Self(last_evaluated_key)
    }

    /// The key attributes of the last item read
    pub fn key(&self) -> &Item {
        &self.0
    }

    /// Convenience: the value to pass as `exclusive_start_key` to scan APIs.
    pub fn into_exclusive_start_key(self) -> Item {
        self.0
    }
}

/// Wrap an item as a put request for `BatchWriteItem`
pub fn put_request(item: Item) -> Result<WriteRequest> {
    let put_request = PutRequest::builder().set_item(Some(item)).build()?;

    Ok(WriteRequest::builder()
        .set_put_request(Some(put_request))
        .build())
}

/// Wrap every item as a put request, preserving order
pub fn put_requests(items: Vec<Item>) -> Result<Vec<WriteRequest>> {
    items.into_iter().map(put_request).collect()
}

/// Deserialize an item into a `serde` type
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T> {
    let value: T = serde_dynamo::from_item(item)?;
    Ok(value)
}

/// Serialize a `serde` type into an item
pub fn to_item<T: Serialize>(value: T) -> Result<Item> {
    Ok(serde_dynamo::to_item::<_, Item>(value)?)
}
