//! # DynamoDB Online Migration
//!
//! Rewrite every item of a live DynamoDB table without taking it offline:
//! - Page-by-page scans with a configurable pause between pages
//! - Item filtering before any write happens
//! - Stream mode: concurrent per-item transforms written back in 25-item batches
//! - Batch mode: a handler takes over each page and writes wherever it needs to
//! - Exponential backoff that narrows each retry to the unprocessed requests
//! - Dead letters for batches that never succeed, persisted as a JSON report
//! - A capacity guard that refuses provisioned tables unless forced
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynamo_migrate::{Error, Item, Migration, MigrationConfig};
//! use aws_sdk_dynamodb::types::AttributeValue;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     // Initialize the global DynamoDB client
//!     let config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
//!     dynamo_migrate::init(&config).await;
//!
//!     let config = MigrationConfig::new("users")
//!         .with_scan_delay(Duration::from_millis(100))
//!         .with_write_delay(Duration::from_millis(50));
//!
//!     let result = Migration::dynamodb(config)
//!         .await
//!         .transform(|mut item: Item| async move {
//!             let _ = item.insert("schema_version".to_string(), AttributeValue::N("2".to_string()));
//!             Ok::<_, Error>(item)
//!         })
//!         .run()
//!         .await?;
//!
//!     if !result.is_clean() {
//!         eprintln!("{} batches failed", result.dead_letters.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::{CallbackError, Error, Result};

/// Item and cursor types shared by every module
pub mod item;

/// Storage seam between the engine and DynamoDB
pub mod store;

/// Fixed pause before each request
pub mod throttle;

/// Exponential backoff
pub mod retry;

/// Page reads
pub mod reader;

/// Chunked batch writes with narrowing retries
pub mod writer;

/// Batches that failed permanently
pub mod dead_letter;

/// Run counters
pub mod counters;

pub mod preflight;

/// Run configuration
pub mod config;

pub mod migration;

/// Table setup utilities for testing
pub mod setup;

pub use config::{MigrationConfig, Mode};
pub use counters::Counters;
pub use dead_letter::{DeadLetterEntry, DeadLetterRecord, DeadLetterReport};
pub use item::{Cursor, Item};
pub use migration::{
    BatchContext, BatchHandler, ItemFilter, ItemTransform, Migration, MigrationResult,
    PageLogger, typed_transform,
};
pub use reader::PageReader;
pub use retry::RetryPolicy;
pub use store::{BatchWriteResult, CapacityMode, ScanPage, TableDescription, TableStore};
pub use throttle::RateGate;
pub use writer::BatchWriter;

// Re-export aws-config types for configuration
pub use aws_config::{
    BehaviorVersion, Region, SdkConfig, defaults,
    meta::region::{ProvideRegion, RegionProviderChain},
    retry::{RetryConfig, RetryMode},
    timeout::TimeoutConfig,
};

// Re-export aws-types for advanced configuration
pub use aws_types::sdk_config::Builder as SdkConfigBuilder;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use tokio::sync::OnceCell;

/// Global DynamoDB client instance
static GLOBAL_CLIENT: OnceCell<DynamoDbClient> = OnceCell::const_new();

/// SDK configuration used when the global client is created implicitly
///
/// Setting `AWS_PROFILE=localstack` points the client at a local endpoint.
async fn aws_config_defaults() -> SdkConfig {
    use std::time::Duration;

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    let mut loader = defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config);

    if std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack" {
        loader = loader.endpoint_url("http://127.0.0.1:4566");
    }

    loader.load().await
}

/// Initialize the global DynamoDB client with a custom AWS config
///
/// Has no effect once the client exists.
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
///         .region(aws_config::Region::new("eu-west-1"))
///         .load()
///         .await;
///     dynamo_migrate::init(&config).await;
/// }
/// ```
pub async fn init(config: &SdkConfig) {
    let _ = GLOBAL_CLIENT
        .get_or_init(|| async { DynamoDbClient::new(config) })
        .await;
}

/// Initialize the global DynamoDB client with a custom client instance
pub async fn init_with_client(client: DynamoDbClient) {
    let _ = GLOBAL_CLIENT.get_or_init(|| async { client }).await;
}

/// Get a reference to the global DynamoDB client
///
/// Initializes it from the environment on first use unless [`init`] or
/// [`init_with_client`] ran before. Defaults: adaptive retry mode with 3 attempts,
/// 3 second connect timeout, 20 second read timeout, 60 second operation timeout.
pub async fn dynamodb_client() -> &'static DynamoDbClient {
    GLOBAL_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            DynamoDbClient::new(&config)
        })
        .await
}
