//! Batches that failed permanently, and the JSON report they are persisted to.

use aws_sdk_dynamodb::types::WriteRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::item::Item;

/// A write batch that exhausted every retry
#[derive(Debug)]
pub struct DeadLetterEntry {
    /// Table the batch was written to
    pub destination: String,
    /// Requests still unconfirmed when the last attempt failed
    pub requests: Vec<WriteRequest>,
    /// Error of the last attempt
    pub error: Error,
}

impl DeadLetterEntry {
    /// Number of requests in the failed batch
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the failed batch is empty
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Items carried by the batch's put requests
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.requests
            .iter()
            .filter_map(|request| request.put_request())
            .map(|put| put.item())
    }

    /// JSON form of the entry as written to the report
    pub fn to_record(&self) -> DeadLetterRecord {
        DeadLetterRecord {
            destination: self.destination.clone(),
            requests: self.requests.iter().map(request_json).collect(),
            error: self.error.to_string(),
        }
    }
}

/// Serialized dead-letter entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// Table the batch was written to
    pub destination: String,
    /// Write requests in DynamoDB request shape (`PutRequest.Item` / `DeleteRequest.Key`)
    pub requests: Vec<Value>,
    /// Rendered terminal error
    pub error: String,
}

/// Document persisted at the end of a run with dead letters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterReport {
    /// Table the run migrated
    pub table: String,
    /// When the report was produced
    pub created_at: DateTime<Utc>,
    /// One record per failed batch
    pub entries: Vec<DeadLetterRecord>,
}

impl DeadLetterReport {
    /// Build a report for `entries` stamped with the current time
    pub fn new(table: impl Into<String>, entries: &[DeadLetterEntry]) -> Self {
        Self {
            table: table.into(),
            created_at: Utc::now(),
            entries: entries.iter().map(DeadLetterEntry::to_record).collect(),
        }
    }

    /// File name the report is written under
    pub fn file_name(&self) -> String {
        format!(
            "dead-letters-{}-{}.json",
            self.table,
            self.created_at.format("%Y%m%dT%H%M%S%.3fZ")
        )
    }
}

/// Write `entries` as a [`DeadLetterReport`] into `dir`, returning the file path
pub async fn persist(table: &str, entries: &[DeadLetterEntry], dir: &Path) -> Result<PathBuf> {
    let report = DeadLetterReport::new(table, entries);
    let path = dir.join(report.file_name());

    let body = serde_json::to_vec_pretty(&report)?;
    tokio::fs::write(&path, body).await?;

    Ok(path)
}

/// Load a report written by [`persist`]
pub async fn read_report(path: &Path) -> Result<DeadLetterReport> {
    let body = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&body)?)
}

fn request_json(request: &WriteRequest) -> Value {
    if let Some(put) = request.put_request() {
        json!({ "PutRequest": { "Item": attributes_json(put.item()) } })
    } else if let Some(delete) = request.delete_request() {
        json!({ "DeleteRequest": { "Key": attributes_json(delete.key()) } })
    } else {
        Value::Null
    }
}

// Binary attributes have no plain JSON form; those items fall back to their debug rendering.
fn attributes_json(item: &Item) -> Value {
    let value: std::result::Result<Value, _> = serde_dynamo::from_item(item.clone());
    value.unwrap_or_else(|_| Value::String(format!("{item:?}")))
}
