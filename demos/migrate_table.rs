//! Backfill a lower-cased email attribute on every user.
//!
//! ```sh
//! AWS_PROFILE=localstack RUST_LOG=info cargo run --example migrate_table -- users
//! ```
use dynamo_migrate::{Error, Item, Migration, MigrationConfig, typed_transform};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    id: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email_lower: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let table = std::env::args().nth(1).unwrap_or_else(|| "users".to_string());

    let config = MigrationConfig::new(table)
        .with_scan_delay(Duration::from_millis(100))
        .with_write_delay(Duration::from_millis(50))
        .with_dead_letter_dir(std::env::temp_dir());

    let result = Migration::dynamodb(config)
        .await
        .filter(|item: &Item| -> Result<bool, Error> { Ok(!item.contains_key("email_lower")) })
        .transform(typed_transform(|mut user: User| {
            user.email_lower = Some(user.email.to_lowercase());
            Ok(user)
        }))
        .on_page(|page, cursor| {
            if let Some(cursor) = cursor {
                println!("page {page} done, resume key: {:?}", cursor.key());
            }
        })
        .run()
        .await?;

    println!(
        "scanned {}, migrated {}, skipped {}",
        result.counters.scanned(),
        result.counters.migrated(),
        result.filtered_out()
    );

    if let Some(path) = &result.dead_letter_file {
        println!("dead letters written to {}", path.display());
    }

    Ok(())
}
