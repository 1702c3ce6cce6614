/// Test helpers for migration integration tests
///
/// [`MemoryStore`] is an in-memory [`TableStore`] that behaves like a DynamoDB table for the
/// calls a migration makes: ordered scans with DynamoDB-style cursors, batch writes that can
/// be scripted to leave requests unprocessed or fail, and a configurable capacity mode.
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, WriteRequest};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::{Arc, Mutex};

#[allow(unused_imports)]
pub use dynamo_migrate::{
    BatchContext, BatchHandler, CapacityMode, Cursor, Error, Item, Migration, MigrationConfig,
    Mode, RetryPolicy, TableStore,
};
use dynamo_migrate::{BatchWriteResult, ScanPage, TableDescription};

/// Partition key attribute of every test table
pub const KEY: &str = "id";

/// What the store does with the next `write_batch` call
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum WriteOutcome {
    /// Apply every request
    Accept,
    /// Apply all but the last `n` requests, which come back unprocessed
    UnprocessLast(usize),
    /// Apply nothing and return every request as unprocessed
    UnprocessAll,
    /// Fail the call with a transport error
    Fail,
}

/// One recorded `scan_page` call
#[allow(dead_code)]
#[derive(Clone, Debug)]
pub struct ScanCall {
    pub table: String,
    pub start_after: Option<String>,
    pub limit: i32,
}

/// One recorded `write_batch` call
#[allow(dead_code)]
#[derive(Clone, Debug)]
pub struct WriteCall {
    pub table: String,
    pub ids: Vec<String>,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, BTreeMap<String, Item>>,
    scans: Vec<ScanCall>,
    writes: Vec<WriteCall>,
    write_script: VecDeque<WriteOutcome>,
    failing_scans: Vec<usize>,
    describe_error: Option<String>,
}

/// In-memory table store
pub struct MemoryStore {
    capacity_mode: CapacityMode,
    state: Mutex<State>,
}

#[allow(dead_code)]
impl MemoryStore {
    /// Empty on-demand store
    pub fn new() -> Arc<Self> {
        Self::with_capacity_mode(CapacityMode::OnDemand)
    }

    /// Empty store reporting `capacity_mode` for every table
    pub fn with_capacity_mode(capacity_mode: CapacityMode) -> Arc<Self> {
        Arc::new(Self {
            capacity_mode,
            state: Mutex::new(State::default()),
        })
    }

    /// Store holding `items` in `table`
    pub fn seeded(table: &str, items: Vec<Item>) -> Arc<Self> {
        let store = Self::new();
        store.seed(table, items);
        store
    }

    /// Insert `items` into `table`
    pub fn seed(&self, table: &str, items: Vec<Item>) {
        let mut state = self.state.lock().unwrap();
        let rows = state.tables.entry(table.to_string()).or_default();
        for item in items {
            let _ = rows.insert(id_of(&item), item);
        }
    }

    /// Queue outcomes for the next `write_batch` calls; calls past the script are accepted
    pub fn script_writes(&self, outcomes: impl IntoIterator<Item = WriteOutcome>) {
        self.state.lock().unwrap().write_script.extend(outcomes);
    }

    /// Make the given `scan_page` calls (1-based, counted across the store) fail
    pub fn fail_scan_calls(&self, calls: &[usize]) {
        self.state.lock().unwrap().failing_scans.extend_from_slice(calls);
    }

    /// Make every `describe` call fail with a transport error carrying `message`
    pub fn fail_describe(&self, message: &str) {
        self.state.lock().unwrap().describe_error = Some(message.to_string());
    }

    pub fn scans(&self) -> Vec<ScanCall> {
        self.state.lock().unwrap().scans.clone()
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Current contents of `table` in key order
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, table: &str, id: &str) -> Option<Item> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .and_then(|rows| rows.get(id).cloned())
    }

    fn scan_now(&self, table: &str, cursor: Option<Cursor>, limit: i32) -> Result<ScanPage, Error> {
        let mut state = self.state.lock().unwrap();

        let start_after = cursor.map(|cursor| id_of(cursor.key()));
        state.scans.push(ScanCall {
            table: table.to_string(),
            start_after: start_after.clone(),
            limit,
        });

        let call = state.scans.len();
        if state.failing_scans.contains(&call) {
            return Err(Error::transport(format!("scan call {call} failed")));
        }

        let limit = usize::try_from(limit).unwrap();
        let lower = match &start_after {
            Some(id) => Bound::Excluded(id.clone()),
            None => Bound::Unbounded,
        };

        let items: Vec<Item> = state
            .tables
            .get(table)
            .map(|rows| {
                rows.range((lower, Bound::Unbounded))
                    .take(limit)
                    .map(|(_, item)| item.clone())
                    .collect()
            })
            .unwrap_or_default();

        // Like DynamoDB, a full page always carries a cursor, even when it ends the table
        let cursor = if items.len() == limit {
            items.last().map(|item| Cursor::new(key_of(&id_of(item))))
        } else {
            None
        };

        Ok(ScanPage {
            consumed_capacity: Some(items.len() as f64 * 0.5),
            items,
            cursor,
        })
    }

    fn write_now(&self, table: &str, requests: Vec<WriteRequest>) -> Result<BatchWriteResult, Error> {
        let mut state = self.state.lock().unwrap();

        state.writes.push(WriteCall {
            table: table.to_string(),
            ids: requests.iter().map(request_id).collect(),
        });

        let outcome = state.write_script.pop_front().unwrap_or(WriteOutcome::Accept);
        let (applied, unprocessed) = match outcome {
            WriteOutcome::Accept => (requests, Vec::new()),
            WriteOutcome::UnprocessLast(n) => {
                let mut applied = requests;
                let split = applied.len().saturating_sub(n);
                let unprocessed = applied.split_off(split);
                (applied, unprocessed)
            }
            WriteOutcome::UnprocessAll => (Vec::new(), requests),
            WriteOutcome::Fail => {
                return Err(Error::transport(format!("write to {table} failed")));
            }
        };

        let rows = state.tables.entry(table.to_string()).or_default();
        for request in &applied {
            let item = request.put_request().unwrap().item().clone();
            let _ = rows.insert(id_of(&item), item);
        }

        let mut result = BatchWriteResult {
            consumed_capacity: Some(applied.len() as f64),
            ..BatchWriteResult::default()
        };
        if !unprocessed.is_empty() {
            let _ = result.unprocessed.insert(table.to_string(), unprocessed);
        }

        Ok(result)
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn scan_page(
        &self,
        table: &str,
        cursor: Option<Cursor>,
        limit: i32,
    ) -> Result<ScanPage, Error> {
        self.scan_now(table, cursor, limit)
    }

    async fn write_batch(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<BatchWriteResult, Error> {
        self.write_now(table, requests)
    }

    async fn describe(&self, table: &str) -> Result<TableDescription, Error> {
        let describe_error = self.state.lock().unwrap().describe_error.clone();
        if let Some(message) = describe_error {
            return Err(Error::transport(message));
        }

        Ok(TableDescription {
            table_name: table.to_string(),
            capacity_mode: self.capacity_mode,
        })
    }
}

/// Item `{ id: S(id), x: N(x) }`
pub fn item(id: &str, x: i64) -> Item {
    HashMap::from([
        (KEY.to_string(), AttributeValue::S(id.to_string())),
        ("x".to_string(), AttributeValue::N(x.to_string())),
    ])
}

/// `count` items with ids `item-000`, `item-001`, ... and `x` equal to their index
pub fn items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| item(&format!("item-{i:03}"), i as i64))
        .collect()
}

/// Key-only item for `id`
pub fn key_of(id: &str) -> Item {
    HashMap::from([(KEY.to_string(), AttributeValue::S(id.to_string()))])
}

pub fn id_of(item: &Item) -> String {
    match item.get(KEY) {
        Some(AttributeValue::S(id)) => id.clone(),
        other => panic!("item without string id: {other:?}"),
    }
}

#[allow(dead_code)]
pub fn number(item: &Item, name: &str) -> Option<i64> {
    match item.get(name) {
        Some(AttributeValue::N(n)) => n.parse().ok(),
        _ => None,
    }
}

pub fn request_id(request: &WriteRequest) -> String {
    id_of(request.put_request().unwrap().item())
}

/// Stream-mode configuration that keeps test output and the working directory clean
#[allow(dead_code)]
pub fn quiet_config(table: &str) -> MigrationConfig {
    MigrationConfig::new(table)
        .with_silent(true)
        .with_dead_letter_persistence(false)
}

/// Install a test log subscriber honoring `RUST_LOG` (idempotent)
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
