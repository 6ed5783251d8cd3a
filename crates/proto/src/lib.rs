//! Wire schemas and dynamic protobuf messages for the Tessera row format.
//!
//! This crate provides:
//! - The persisted wire schema model ([`schema`])
//! - Compiled, validated descriptors ([`descriptor`])
//! - Dynamic messages encoded with `prost` ([`message`])
//!
//! # Architecture
//!
//! Wire schemas are generated outside the row format from table
//! definitions and annotated with stable column and table identities.
//! This crate only reads them: it never decides field numbers or names.

#![deny(unsafe_code)]

pub mod descriptor;
pub mod error;
pub mod message;
pub mod schema;

pub use descriptor::{FieldDescriptor, MessageDescriptor, TableAnnotation, WireSchema};
pub use error::WireError;
pub use message::{DynamicMessage, WireValue};
pub use schema::{ColumnOptions, FieldKind, FieldProto, MessageProto, TableOptions, WireSchemaProto};
