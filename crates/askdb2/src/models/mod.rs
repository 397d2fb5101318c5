pub mod response;
pub mod schema;

pub use response::{AskCommandFailure, AskResponse, FailureKind, json_schema};
pub use schema::{ColumnDescriptor, SchemaSnapshot};
