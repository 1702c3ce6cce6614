/// DynamoDB Migration Tests
///
/// Runs the engine against a real DynamoDB endpoint. Start LocalStack and run with
/// `AWS_PROFILE=localstack cargo test -- --ignored`.
use aws_sdk_dynamodb::types::AttributeValue;
use dynamo_migrate::{BatchWriter, PageReader, dynamodb_client, setup};
use rusty_ulid::generate_ulid_string;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

mod helpers;
use helpers::*;

async fn fresh_table(capacity_mode: CapacityMode) -> String {
    let table = format!("migrate_{}", generate_ulid_string().to_lowercase());
    let client = dynamodb_client().await;
    let _ = setup::create_table(client, &table, KEY, capacity_mode)
        .await
        .unwrap();
    table
}

async fn read_all(table: &str) -> Vec<Item> {
    let reader = PageReader::new(Arc::new(dynamodb_client().await.clone()), table);
    let mut cursor = None;
    let mut all = Vec::new();

    loop {
        let page = reader.read(cursor.take()).await.unwrap();
        all.extend(page.items);
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    all
}

/// Test a stream-mode run rewrites every item in place
#[tokio::test]
#[serial]
#[ignore = "requires a DynamoDB endpoint"]
async fn test_stream_migration_against_dynamodb() {
    init_tracing();
    let table = fresh_table(CapacityMode::OnDemand).await;
    let store: Arc<dyn TableStore> = Arc::new(dynamodb_client().await.clone());

    let dead_letters = BatchWriter::new(store)
        .write(&table, items(60), Duration::ZERO, false)
        .await
        .unwrap();
    assert!(dead_letters.is_empty());

    let result = Migration::dynamodb(
        MigrationConfig::new(&table)
            .with_write_delay(Duration::from_millis(10))
            .with_dead_letter_persistence(false),
    )
    .await
    .filter(|item: &Item| -> Result<bool, Error> { Ok(number(item, "x").unwrap_or(0) % 3 == 0) })
    .transform(|mut item: Item| async move {
        let _ = item.insert("v".to_string(), AttributeValue::N("2".to_string()));
        Ok::<_, Error>(item)
    })
    .run()
    .await
    .unwrap();

    assert!(result.is_clean());
    assert_eq!(result.counters.scanned(), 60);
    assert_eq!(result.counters.migrated(), 20);

    let stored = read_all(&table).await;
    assert_eq!(stored.len(), 60);
    let rewritten = stored.iter().filter(|item| item.contains_key("v")).count();
    assert_eq!(rewritten, 20);
}

/// Test a provisioned table is refused unless forced
#[tokio::test]
#[serial]
#[ignore = "requires a DynamoDB endpoint"]
async fn test_provisioned_guard_against_dynamodb() {
    let table = fresh_table(CapacityMode::Provisioned).await;

    let err = Migration::dynamodb(MigrationConfig::new(&table).with_silent(true))
        .await
        .transform(|item: Item| async move { Ok::<_, Error>(item) })
        .run()
        .await
        .unwrap_err();
    assert!(err.is_preflight_error());

    let result = Migration::dynamodb(
        MigrationConfig::new(&table)
            .with_silent(true)
            .with_force(true),
    )
    .await
    .transform(|item: Item| async move { Ok::<_, Error>(item) })
    .run()
    .await
    .unwrap();
    assert_eq!(result.counters.scanned(), 0);
}
