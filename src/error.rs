use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use serde_dynamo::Error as SerdeDynamoError;
use serde_json::Error as SerdeJsonError;
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;

use crate::store::CapacityMode;

type DynamoScanError = SdkError<ScanError, Response>;
type DynamoBatchWriteItemError = SdkError<BatchWriteItemError, Response>;
type DynamoDescribeTableError = SdkError<DescribeTableError, Response>;
type DynamoCreateTableError = SdkError<CreateTableError, Response>;

/// Boxed error raised by caller-supplied migration logic
pub type CallbackError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Migration error
#[derive(Debug)]
pub enum Error {
    /// Serde DynamoDB serialization/deserialization error
    SerdeDynamo(SerdeDynamoError),
    /// JSON error while writing or reading a dead-letter report
    SerdeJson(SerdeJsonError),
    /// File system error while persisting a dead-letter report
    Io(IoError),
    /// DynamoDB request builder error
    BuildError(BuildError),
    /// DynamoDB Scan operation error
    DynamoScanError(DynamoScanError),
    /// DynamoDB BatchWriteItem operation error
    DynamoBatchWriteItemError(DynamoBatchWriteItemError),
    /// DynamoDB DescribeTable operation error
    DynamoDescribeTableError(DynamoDescribeTableError),
    /// DynamoDB CreateTable operation error
    DynamoCreateTableError(DynamoCreateTableError),
    /// Store failure reported by a non-SDK [`TableStore`](crate::store::TableStore)
    Transport(String),
    /// Invalid run configuration
    Config(String),
    /// The table is not on on-demand capacity and the override was not set
    Preflight {
        /// Table that failed the guard
        table: String,
        /// Capacity mode reported by the table metadata
        capacity_mode: CapacityMode,
    },
    /// The store declined part of a batch.
    ///
    /// Drives backoff inside the batch writer. It is only ever visible as the recorded
    /// error of a dead-letter entry whose batch stayed throttled for every attempt.
    UnprocessedItems {
        /// Destination table
        table: String,
        /// Number of requests left unprocessed by the last attempt
        count: usize,
    },
    /// Error raised by a caller-supplied filter, transform or batch handler
    Callback(CallbackError),
}

impl Error {
    /// Wrap an error raised by caller logic
    pub fn callback<E>(error: E) -> Self
    where
        E: Into<CallbackError>,
    {
        Error::Callback(error.into())
    }

    /// Create a transport error from a message
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport(message.into())
    }

    /// Create a configuration error from a message
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Check if the error came from the store's network/service layer
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Error::DynamoScanError(_)
                | Error::DynamoBatchWriteItemError(_)
                | Error::DynamoDescribeTableError(_)
                | Error::DynamoCreateTableError(_)
                | Error::Transport(_)
        )
    }

    /// Check if the error is the pre-flight capacity guard
    pub fn is_preflight_error(&self) -> bool {
        matches!(self, Error::Preflight { .. })
    }

    /// Check if the error is the unprocessed-items throttling signal
    pub fn is_unprocessed_items(&self) -> bool {
        matches!(self, Error::UnprocessedItems { .. })
    }

    /// Check if the error was raised by caller logic
    pub fn is_callback_error(&self) -> bool {
        matches!(self, Error::Callback(_))
    }

    /// Check if the error is a serialization/deserialization error
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::SerdeDynamo(_) | Error::SerdeJson(_))
    }
}

macro_rules! impl_from_error {
    ($name:ident, $variant:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$variant(e)
            }
        }
    };
    ($name:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$name(e)
            }
        }
    };
}

impl_from_error!(SerdeDynamoError, SerdeDynamo);
impl_from_error!(SerdeJsonError, SerdeJson);
impl_from_error!(IoError, Io);
impl_from_error!(BuildError);
impl_from_error!(DynamoScanError);
impl_from_error!(DynamoBatchWriteItemError);
impl_from_error!(DynamoDescribeTableError);
impl_from_error!(DynamoCreateTableError);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerdeDynamo(e) => write!(f, "DynamoDB serialization error: {}", e),
            Error::SerdeJson(e) => write!(f, "JSON error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::BuildError(e) => write!(f, "DynamoDB request builder error: {}", e),
            Error::DynamoScanError(e) => {
                write!(f, "DynamoDB Scan operation failed: {}", e)
            }
            Error::DynamoBatchWriteItemError(e) => {
                write!(f, "DynamoDB BatchWriteItem operation failed: {}", e)
            }
            Error::DynamoDescribeTableError(e) => {
                write!(f, "DynamoDB DescribeTable operation failed: {}", e)
            }
            Error::DynamoCreateTableError(e) => {
                write!(f, "DynamoDB CreateTable operation failed: {}", e)
            }
            Error::Transport(message) => write!(f, "Store request failed: {}", message),
            Error::Config(message) => write!(f, "Configuration error: {}", message),
            Error::Preflight {
                table,
                capacity_mode,
            } => write!(
                f,
                "Table {} uses {} capacity; refusing to rewrite it without the force override",
                table, capacity_mode
            ),
            Error::UnprocessedItems { table, count } => {
                write!(f, "{} write requests to {} were left unprocessed", count, table)
            }
            Error::Callback(e) => write!(f, "Migration callback failed: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::SerdeDynamo(e) => Some(e),
            Error::SerdeJson(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::BuildError(e) => Some(e),
            Error::DynamoScanError(e) => Some(e),
            Error::DynamoBatchWriteItemError(e) => Some(e),
            Error::DynamoDescribeTableError(e) => Some(e),
            Error::DynamoCreateTableError(e) => Some(e),
            Error::Callback(e) => Some(e.as_ref()),
            Error::Transport(_)
            | Error::Config(_)
            | Error::Preflight { .. }
            | Error::UnprocessedItems { .. } => None,
        }
    }
}
