//! The table's network client, seen only through the three calls a migration needs.
//!
//! [`TableStore`] is implemented for [`aws_sdk_dynamodb::Client`] in [`dynamodb`]; tests and
//! embedders can supply their own implementation.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::WriteRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::item::{Cursor, Item};

/// DynamoDB implementation of [`TableStore`]
pub mod dynamodb;

/// One bounded page returned by [`TableStore::scan_page`]
#[derive(Debug, Default)]
pub struct ScanPage {
    /// Items in source order
    pub items: Vec<Item>,
    /// Continuation cursor; `None` once the table is exhausted
    pub cursor: Option<Cursor>,
    /// Read capacity units consumed, when the store reports them
    pub consumed_capacity: Option<f64>,
}

/// Outcome of one [`TableStore::write_batch`] submission
#[must_use = "unprocessed requests must be resubmitted"]
#[derive(Debug, Default)]
pub struct BatchWriteResult {
    /// Requests the store declined to apply, keyed by table
    pub unprocessed: HashMap<String, Vec<WriteRequest>>,
    /// Write capacity units consumed, when the store reports them
    pub consumed_capacity: Option<f64>,
}

impl BatchWriteResult {
    /// Remove and return the unprocessed requests for one table
    pub fn take_unprocessed(&mut self, table: &str) -> Vec<WriteRequest> {
        self.unprocessed.remove(table).unwrap_or_default()
    }
}

/// Throughput billing mode of a table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityMode {
    /// On-demand (pay per request)
    OnDemand,
    /// Fixed provisioned read/write capacity
    Provisioned,
}

impl fmt::Display for CapacityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityMode::OnDemand => f.write_str("on-demand"),
            CapacityMode::Provisioned => f.write_str("provisioned"),
        }
    }
}

/// Table metadata used by the pre-flight guard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescription {
    /// Table name
    pub table_name: String,
    /// Current billing mode
    pub capacity_mode: CapacityMode,
}

/// Read, write and describe access to a key-value table
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Read up to `limit` items starting after `cursor` (`None` starts the table)
    async fn scan_page(
        &self,
        table: &str,
        cursor: Option<Cursor>,
        limit: i32,
    ) -> Result<ScanPage>;

    /// Submit one batch of at most 25 write requests
    async fn write_batch(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<BatchWriteResult>;

    /// Describe the table's capacity configuration
    async fn describe(&self, table: &str) -> Result<TableDescription>;
}
