use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::create_table::{CreateTableError, CreateTableOutput};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType,
};

use crate::error::Error;
use crate::store::CapacityMode;

/// Create a table keyed by a single string partition key
///
/// A table that already exists is left as it is. Provisioned tables get 10 read and 10
/// write capacity units.
pub async fn create_table(
    client: &Client,
    table: &str,
    partition_key: &str,
    capacity_mode: CapacityMode,
) -> Result<CreateTableOutput, Error> {
    let mut builder = client
        .create_table()
        .table_name(table)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(partition_key)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(partition_key)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        );

    builder = match capacity_mode {
        CapacityMode::OnDemand => builder.billing_mode(BillingMode::PayPerRequest),
        CapacityMode::Provisioned => builder
            .billing_mode(BillingMode::Provisioned)
            .provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(10)
                    .write_capacity_units(10)
                    .build()?,
            ),
    };

    match builder.send().await {
        Ok(output) => Ok(output),
        Err(e) => {
            if let Some(CreateTableError::ResourceInUseException(_)) = e.as_service_error() {
                return Ok(CreateTableOutput::builder().build());
            }
            Err(e.into())
        }
    }
}
