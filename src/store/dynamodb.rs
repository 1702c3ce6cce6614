use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{BillingMode, ReturnConsumedCapacity, WriteRequest};
use tracing::debug;

use crate::error::Result;
use crate::item::Cursor;
use crate::store::{BatchWriteResult, CapacityMode, ScanPage, TableDescription, TableStore};

#[async_trait]
impl TableStore for Client {
    async fn scan_page(
        &self,
        table: &str,
        cursor: Option<Cursor>,
        limit: i32,
    ) -> Result<ScanPage> {
        let output = self
            .scan()
            .table_name(table)
            .limit(limit)
            .set_exclusive_start_key(cursor.map(Cursor::into_exclusive_start_key))
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await?;

        Ok(ScanPage {
            items: output.items.unwrap_or_default(),
            cursor: output.last_evaluated_key.map(Cursor::new),
            consumed_capacity: output.consumed_capacity.and_then(|cc| cc.capacity_units),
        })
    }

    async fn write_batch(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<BatchWriteResult> {
        let output = self
            .batch_write_item()
            .request_items(table, requests)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await?;

        let consumed_capacity = output.consumed_capacity.map(|capacities| {
            capacities
                .iter()
                .map(|cc| cc.capacity_units().unwrap_or(0.0))
                .sum::<f64>()
        });

        Ok(BatchWriteResult {
            unprocessed: output.unprocessed_items.unwrap_or_default(),
            consumed_capacity,
        })
    }

    async fn describe(&self, table: &str) -> Result<TableDescription> {
        let output = self.describe_table().table_name(table).send().await?;

        let billing_mode = output
            .table()
            .and_then(|t| t.billing_mode_summary())
            .and_then(|summary| summary.billing_mode());

        debug!(table, ?billing_mode, "described table");

        // Tables created before on-demand existed carry no billing mode summary.
        let capacity_mode = match billing_mode {
            Some(BillingMode::PayPerRequest) => CapacityMode::OnDemand,
            _ => CapacityMode::Provisioned,
        };

        Ok(TableDescription {
            table_name: table.to_string(),
            capacity_mode,
        })
    }
}
