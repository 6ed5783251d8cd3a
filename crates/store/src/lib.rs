//! tessera-store: storage descriptions for protobuf-encoded rows.
//!
//! A storage description belongs to one table or table group and turns its
//! rows into the value type a backend stores:
//!
//! - **Key-value**: message bytes as `bytes::Bytes`
//! - **B-tree**: `[table id][table message]` frames through a [`ValueCoder`]
//! - **In-memory**: message bytes as `Vec<u8>`, structured rows only
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │      RowStorageDescription (per backend)     │
//! │   pack / expand, legacy flat rows, clone     │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │           ProtobufStorageFormat              │
//! │  owner, format type, schema, lazy converter  │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │        RowConverter (tessera-rowformat)      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tessera_store::{KvStorageDescription, RowStorageDescription, backend::InMemoryKvBackend};
//! use tessera_types::{ProtobufFormatType, Row, RowFormatConfig, Table};
//! # fn run(table: Arc<Table>, schema: Arc<tessera_proto::WireSchema>, row: Row) -> tessera_store::Result<()> {
//! let description =
//!     KvStorageDescription::new(table, ProtobufFormatType::SingleTable, schema, RowFormatConfig::default());
//! let backend = InMemoryKvBackend::new();
//! description.write_row(&backend, b"key", &row)?;
//! let stored = description.read_row(&backend, b"key")?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod backend;
pub mod coder;
pub mod description;
pub mod error;
pub mod format;
pub mod owner;

pub use coder::{ConverterResolver, FormatRegistry, ProtobufValueCoder, ValueBuffer, ValueCoder};
pub use description::{
    BTreeStorageDescription, KvStorageDescription, MemoryStorageDescription, RowStorageDescription,
};
pub use error::{Result, StoreError};
pub use format::ProtobufStorageFormat;
pub use owner::StorageOwner;
