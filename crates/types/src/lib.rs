//! Logical model shared across the Tessera row format crates.
//!
//! This crate provides:
//! - Identifier types ([`TableId`])
//! - Column types, values and rows
//! - Tables and parent-child table groups
//! - The legacy flat row layout
//! - Row format configuration
//! - Error types and machine-readable codes using snafu

pub mod column;
pub mod config;
pub mod error;
pub mod flat;
pub mod row;
pub mod schema;
pub mod types;
pub mod value;

// Re-export commonly used types at crate root
pub use column::{Column, ColumnType, IntWidth, MAX_DECIMAL_PRECISION};
pub use config::{ConfigError, ProtobufFormatType, RowFormatConfig};
pub use error::{ErrorCode, RowError, SchemaError};
pub use flat::FlatRow;
pub use row::Row;
pub use schema::{Join, Table, TableGroup};
pub use types::*;
pub use value::Value;
