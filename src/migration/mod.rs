//! The migration engine.
//!
//! A run reads the table one page at a time, filters each page, and then either transforms
//! and writes every selected item itself ([`Mode::Stream`]) or hands the selected items to a
//! [`BatchHandler`] ([`Mode::Batch`]). It stops when a page comes back without a cursor.
//!
//! ```rust,no_run
//! use dynamo_migrate::{Error, Item, Migration, MigrationConfig};
//! use aws_sdk_dynamodb::types::AttributeValue;
//!
//! # async fn example() -> Result<(), Error> {
//! let config = MigrationConfig::new("users").with_write_delay(std::time::Duration::from_millis(50));
//!
//! let result = Migration::dynamodb(config)
//!     .await
//!     .filter(|item: &Item| -> Result<bool, Error> { Ok(!item.contains_key("email_lower")) })
//!     .transform(|mut item: Item| async move {
//!         if let Some(AttributeValue::S(email)) = item.get("email") {
//!             let lower = AttributeValue::S(email.to_lowercase());
//!             let _ = item.insert("email_lower".to_string(), lower);
//!         }
//!         Ok::<_, Error>(item)
//!     })
//!     .run()
//!     .await?;
//!
//! println!("migrated {} items", result.counters.migrated());
//! # Ok(())
//! # }
//! ```

use futures_util::{StreamExt, TryStreamExt};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::{MigrationConfig, Mode};
use crate::counters::Counters;
use crate::dead_letter::{self, DeadLetterEntry};
use crate::dynamodb_client;
use crate::error::{Error, Result};
use crate::item::{Cursor, Item};
use crate::preflight::{self, Clearance};
use crate::reader::PageReader;
use crate::store::TableStore;
use crate::throttle::RateGate;
use crate::writer::BatchWriter;

mod strategy;

pub use strategy::{
    BatchContext, BatchHandler, ItemFilter, ItemTransform, PageLogger, typed_transform,
};

type PageHook = Arc<dyn Fn(u64, Option<&Cursor>) + Send + Sync>;

/// Outcome of a completed run
#[must_use = "migration results carry dead letters that should be checked"]
#[derive(Debug)]
pub struct MigrationResult {
    /// Final counter values
    pub counters: Counters,
    /// Batches that failed permanently, across every destination written during the run
    pub dead_letters: Vec<DeadLetterEntry>,
    /// Report file the dead letters were persisted to, if any
    pub dead_letter_file: Option<PathBuf>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl MigrationResult {
    /// Whether every write succeeded
    pub fn is_clean(&self) -> bool {
        self.dead_letters.is_empty()
    }

    /// Number of write requests held in dead letters
    pub fn dead_lettered_requests(&self) -> usize {
        self.dead_letters.iter().map(DeadLetterEntry::len).sum()
    }

    /// Items the filter rejected
    pub fn filtered_out(&self) -> u64 {
        self.counters.filtered_out()
    }

    fn log_summary(&self, table: &str) {
        info!(
            table,
            pages = self.counters.pages(),
            scanned = self.counters.scanned(),
            migrated = self.counters.migrated(),
            filtered_out = self.filtered_out(),
            dead_letters = self.dead_letters.len(),
            elapsed = ?self.elapsed,
            "migration complete"
        );

        for (name, value) in self.counters.custom() {
            info!(counter = name, value, "custom counter");
        }
    }
}

/// Write strategy resolved from the configured mode
enum Strategy {
    Stream(Arc<dyn ItemTransform>),
    Batch(Arc<dyn BatchHandler>),
}

/// Per-run mutable state
struct RunState {
    counters: Counters,
    dead_letters: Vec<DeadLetterEntry>,
    cursor: Option<Cursor>,
}

/// A configured migration run
///
/// Build it with [`Migration::new`] (any [`TableStore`]) or [`Migration::dynamodb`] (the
/// global DynamoDB client), attach the strategies for the configured mode, then [`run`].
///
/// [`run`]: Migration::run
pub struct Migration {
    store: Arc<dyn TableStore>,
    config: MigrationConfig,
    filter: Arc<dyn ItemFilter>,
    transform: Option<Arc<dyn ItemTransform>>,
    batch_handler: Option<Arc<dyn BatchHandler>>,
    start_after: Option<Cursor>,
    on_page: Option<PageHook>,
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("config", &self.config)
            .field("transform", &self.transform.is_some())
            .field("batch_handler", &self.batch_handler.is_some())
            .field("start_after", &self.start_after)
            .finish_non_exhaustive()
    }
}

impl Migration {
    /// Migration over `store` that selects every item
    pub fn new(store: Arc<dyn TableStore>, config: MigrationConfig) -> Self {
        Self {
            store,
            config,
            filter: Arc::new(|_: &Item| -> Result<bool> { Ok(true) }),
            transform: None,
            batch_handler: None,
            start_after: None,
            on_page: None,
        }
    }

    /// Migration using the global DynamoDB client
    pub async fn dynamodb(config: MigrationConfig) -> Self {
        let client = dynamodb_client().await.clone();
        Self::new(Arc::new(client), config)
    }

    /// Only migrate items the filter selects
    pub fn filter(mut self, filter: impl ItemFilter + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Per-item transform used in stream mode
    pub fn transform(mut self, transform: impl ItemTransform + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Page handler used in batch mode
    pub fn batch_handler(mut self, handler: impl BatchHandler + 'static) -> Self {
        self.batch_handler = Some(Arc::new(handler));
        self
    }

    /// Start scanning after `cursor` instead of at the beginning of the table
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Called after each completed page with its number and the cursor of the next page
    ///
    /// Persisting the cursor lets an interrupted run resume with [`Migration::start_after`].
    pub fn on_page<F>(mut self, hook: F) -> Self
    where
        F: Fn(u64, Option<&Cursor>) + Send + Sync + 'static,
    {
        self.on_page = Some(Arc::new(hook));
        self
    }

    /// The run configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn strategy(&self) -> Result<Strategy> {
        match self.config.mode {
            Mode::Stream => self
                .transform
                .clone()
                .map(Strategy::Stream)
                .ok_or_else(|| Error::config("stream mode requires a transform")),
            Mode::Batch => self
                .batch_handler
                .clone()
                .map(Strategy::Batch)
                .ok_or_else(|| Error::config("batch mode requires a batch handler")),
        }
    }

    /// Migrate the whole table
    ///
    /// Fails before reading anything when the configuration is incomplete or the capacity
    /// guard refuses the table. Page read errors and errors from the filter, transform or
    /// batch handler abort the run; write failures are collected as dead letters instead.
    pub async fn run(self) -> Result<MigrationResult> {
        self.config.validate()?;
        let strategy = self.strategy()?;

        let Migration {
            store,
            config,
            filter,
            start_after,
            on_page,
            ..
        } = self;

        let started = Instant::now();
        let table = config.table_name.as_str();
        let quiet = config.silent;

        match preflight::guard(store.as_ref(), table, config.force).await? {
            Clearance::Allowed(_) => {}
            Clearance::Overridden(description) => {
                if !quiet {
                    warn!(
                        table,
                        capacity_mode = %description.capacity_mode,
                        "capacity guard overridden"
                    );
                }
            }
            Clearance::Unchecked(error) => {
                if !quiet {
                    warn!(table, %error, "table metadata unavailable, capacity guard skipped");
                }
            }
        }

        let mut reader = PageReader::new(Arc::clone(&store), table);
        if let Some(policy) = &config.scan_retry {
            reader = reader.with_retry(policy.clone());
        }
        let writer = BatchWriter::with_retry(Arc::clone(&store), config.retry.clone());
        let scan_gate = RateGate::new(config.scan_delay());

        let mut state = RunState {
            counters: Counters::new(config.custom_counters.as_slice()),
            dead_letters: Vec::new(),
            cursor: start_after,
        };

        loop {
            let page_number = state.counters.pages() + 1;

            scan_gate.wait().await;
            let page = reader.read(state.cursor.take()).await?;
            state.counters.add(Counters::SCANNED, page.items.len() as u64);

            let selected = select(filter.as_ref(), page.items)?;
            let selected_count = selected.len();
            state.counters.add(Counters::MIGRATED, selected_count as u64);

            let logger = PageLogger::new(page_number, quiet);

            match &strategy {
                Strategy::Stream(transform) => {
                    let transformed =
                        transform_all(transform.as_ref(), selected, config.transform_concurrency)
                            .await?;
                    let entries = writer
                        .write(table, transformed, config.write_delay(), quiet)
                        .await?;
                    state.dead_letters.extend(entries);
                }
                Strategy::Batch(handler) => {
                    let mut context = BatchContext::new(
                        &mut state.counters,
                        &mut state.dead_letters,
                        &writer,
                        logger,
                        config.write_delay(),
                    );
                    handler.handle(selected, &mut context).await?;
                }
            }

            state.counters.increment(Counters::PAGES);
            logger.log(format_args!(
                "selected {} items; {} scanned, {} migrated so far",
                selected_count,
                state.counters.scanned(),
                state.counters.migrated()
            ));

            if let Some(hook) = &on_page {
                hook(page_number, page.cursor.as_ref());
            }

            match page.cursor {
                Some(cursor) => state.cursor = Some(cursor),
                None => break,
            }
        }

        let mut dead_letter_file = None;
        if !state.dead_letters.is_empty() && config.persist_dead_letters {
            match dead_letter::persist(table, &state.dead_letters, &config.dead_letter_dir).await {
                Ok(path) => {
                    if !quiet {
                        warn!(
                            path = %path.display(),
                            entries = state.dead_letters.len(),
                            "dead letters written"
                        );
                    }
                    dead_letter_file = Some(path);
                }
                // Still logged when silent: the entries would otherwise only live in memory.
                Err(error) => error!(%error, "failed to persist dead letters"),
            }
        }

        let result = MigrationResult {
            counters: state.counters,
            dead_letters: state.dead_letters,
            dead_letter_file,
            elapsed: started.elapsed(),
        };

        if !quiet {
            result.log_summary(table);
        }

        Ok(result)
    }
}

fn select(filter: &dyn ItemFilter, items: Vec<Item>) -> Result<Vec<Item>> {
    let mut selected = Vec::with_capacity(items.len());

    for item in items {
        if filter.select(&item)? {
            selected.push(item);
        }
    }

    Ok(selected)
}

async fn transform_all(
    transform: &dyn ItemTransform,
    items: Vec<Item>,
    concurrency: usize,
) -> Result<Vec<Item>> {
    tokio_stream::iter(items)
        .map(|item| transform.transform(item))
        .buffer_unordered(concurrency)
        .try_collect()
        .await
}
