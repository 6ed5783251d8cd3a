//! Conversion between logical rows and protobuf messages.
//!
//! This crate provides:
//! - Per-type column codecs ([`conversion`])
//! - The packed decimal layout used for wide decimals ([`decimal`])
//! - Table and group row converters ([`table`], [`group`], [`converter`])
//!
//! Converters are built once from a table or group and its compiled wire
//! schema and are immutable afterwards, so a single instance can be shared
//! across threads behind an `Arc`.

#![deny(unsafe_code)]

pub mod conversion;
pub mod converter;
pub mod decimal;
pub mod error;
pub mod group;
pub mod table;

pub use conversion::ColumnConversion;
pub use converter::RowConverter;
pub use error::ConversionError;
pub use group::GroupConverter;
pub use table::TableConverter;
