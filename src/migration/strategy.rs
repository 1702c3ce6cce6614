use async_trait::async_trait;
use futures_util::future::{Ready, ready};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::info;

use crate::counters::Counters;
use crate::dead_letter::DeadLetterEntry;
use crate::error::Result;
use crate::item::{Item, from_item, to_item};
use crate::writer::BatchWriter;

/// Decides which scanned items are migrated
///
/// Implemented for any `Fn(&Item) -> Result<bool>`.
pub trait ItemFilter: Send + Sync {
    /// `true` keeps the item, `false` filters it out
    fn select(&self, item: &Item) -> Result<bool>;
}

impl<F> ItemFilter for F
where
    F: Fn(&Item) -> Result<bool> + Send + Sync,
{
    fn select(&self, item: &Item) -> Result<bool> {
        self(item)
    }
}

/// Rewrites one selected item in stream mode
///
/// Implemented for any `Fn(Item) -> impl Future<Output = Result<Item>>`. Transforms of one
/// page may run concurrently, so implementations should not rely on ordering.
#[async_trait]
pub trait ItemTransform: Send + Sync {
    /// Produce the item to write in place of `item`
    async fn transform(&self, item: Item) -> Result<Item>;
}

#[async_trait]
impl<F, Fut> ItemTransform for F
where
    F: Fn(Item) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Item>> + Send + 'static,
{
    async fn transform(&self, item: Item) -> Result<Item> {
        self(item).await
    }
}

/// Adapt a synchronous transform over `serde` types into an [`ItemTransform`]
pub fn typed_transform<T, U, F>(f: F) -> impl ItemTransform
where
    T: DeserializeOwned + 'static,
    U: Serialize + 'static,
    F: Fn(T) -> Result<U> + Send + Sync + 'static,
{
    move |item: Item| -> Ready<Result<Item>> {
        ready(from_item(item).and_then(&f).and_then(to_item))
    }
}

/// Takes over a whole filtered page in batch mode
///
/// The handler is responsible for every write; use [`BatchContext::write`] so failed batches
/// are reported with the run's dead letters.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    /// Process the selected items of one page
    async fn handle(&self, items: Vec<Item>, context: &mut BatchContext<'_>) -> Result<()>;
}

/// Logging scoped to one page of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLogger {
    page: u64,
    quiet: bool,
}

impl PageLogger {
    pub(crate) fn new(page: u64, quiet: bool) -> Self {
        Self { page, quiet }
    }

    /// Page number, starting at 1
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Log `message` tagged with the page number, unless the run is silent
    pub fn log(&self, message: impl fmt::Display) {
        if !self.quiet {
            info!(page = self.page, "{}", message);
        }
    }
}

/// Everything a [`BatchHandler`] may touch while handling a page
#[derive(Debug)]
pub struct BatchContext<'a> {
    counters: &'a mut Counters,
    dead_letters: &'a mut Vec<DeadLetterEntry>,
    writer: &'a BatchWriter,
    logger: PageLogger,
    write_delay: Duration,
}

impl<'a> BatchContext<'a> {
    pub(crate) fn new(
        counters: &'a mut Counters,
        dead_letters: &'a mut Vec<DeadLetterEntry>,
        writer: &'a BatchWriter,
        logger: PageLogger,
        write_delay: Duration,
    ) -> Self {
        Self {
            counters,
            dead_letters,
            writer,
            logger,
            write_delay,
        }
    }

    /// The run's counters
    pub fn counters(&mut self) -> &mut Counters {
        &mut *self.counters
    }

    /// Page-scoped logger
    pub fn logger(&self) -> PageLogger {
        self.logger
    }

    /// Log `message` tagged with the page number
    pub fn log(&self, message: impl fmt::Display) {
        self.logger.log(message);
    }

    /// The run's batch writer, for callers that want to handle dead letters themselves
    pub fn writer(&self) -> &BatchWriter {
        self.writer
    }

    /// Write `items` to `destination` with the run's write delay
    ///
    /// Failed batches are added to the run's dead letters; returns how many were added.
    pub async fn write(&mut self, destination: &str, items: Vec<Item>) -> Result<usize> {
        let entries = self
            .writer
            .write(destination, items, self.write_delay, self.logger.quiet)
            .await?;

        let count = entries.len();
        self.dead_letters.extend(entries);
        Ok(count)
    }
}
