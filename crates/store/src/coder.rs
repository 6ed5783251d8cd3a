//! Value framing for the B-tree backend.
//!
//! The B-tree stores rows through a [`ValueCoder`], its extension point for
//! serializing custom value types. [`ProtobufValueCoder`] frames each row
//! as:
//!
//! ```text
//! [table id: u32 BE][table message bytes]
//! ```
//!
//! Only the member table's own message is stored, never the group wrapper,
//! so the frame header alone selects the table converter.

use std::{collections::HashMap, fmt::Write as _, sync::Arc};

use byteorder::{BigEndian, ByteOrder};
use parking_lot::RwLock;
use snafu::ResultExt;
use tessera_proto::DynamicMessage;
use tessera_rowformat::{RowConverter, error::WireSnafu};
use tessera_types::{Row, TableId};
use tracing::error;

use crate::{
    error::{ConversionSnafu, Result, StoreError},
    format::ProtobufStorageFormat,
};

/// Length of the table id frame header.
pub const FRAME_HEADER_LEN: usize = 4;

/// Serialized value as exchanged with the B-tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueBuffer {
    bytes: Vec<u8>,
}

impl ValueBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps stored bytes.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The buffered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer, returning its bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Empties the buffer, keeping its allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    fn put_u32(&mut self, value: u32) {
        let mut word = [0u8; 4];
        BigEndian::write_u32(&mut word, value);
        self.bytes.extend_from_slice(&word);
    }

    fn split_frame(&self) -> Result<(TableId, &[u8])> {
        if self.bytes.len() < FRAME_HEADER_LEN {
            return Err(StoreError::Truncated { len: self.bytes.len(), needed: FRAME_HEADER_LEN });
        }
        let (head, body) = self.bytes.split_at(FRAME_HEADER_LEN);
        Ok((TableId::new(BigEndian::read_u32(head)), body))
    }
}

impl From<Vec<u8>> for ValueBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

/// Serialization hooks the B-tree calls for custom values.
pub trait ValueCoder: Send + Sync {
    /// Appends the serialized `row` to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be serialized.
    fn put(&self, row: &Row, out: &mut ValueBuffer) -> Result<()>;

    /// Deserializes a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not hold a valid value.
    fn get(&self, buf: &ValueBuffer) -> Result<Row>;

    /// Deserializes into an existing row, reusing its allocation.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    fn render(&self, buf: &ValueBuffer, target: &mut Row) -> Result<()> {
        *target = self.get(buf)?;
        Ok(())
    }

    /// Appends a human-readable form of the value to `out`. Never fails.
    fn display(&self, buf: &ValueBuffer, out: &mut String);
}

/// Looks up converters by table id for display tooling.
pub trait ConverterResolver: Send + Sync {
    /// Converter able to decode rows of `table_id`, if one is known.
    fn resolve(&self, table_id: TableId) -> Option<Arc<RowConverter>>;
}

impl ConverterResolver for ProtobufStorageFormat {
    fn resolve(&self, table_id: TableId) -> Option<Arc<RowConverter>> {
        self.converter().ok().filter(|c| c.contains_table(table_id))
    }
}

/// Resolver over every registered storage format.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    formats: RwLock<HashMap<TableId, Arc<ProtobufStorageFormat>>>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `format` for every table its owner stores, replacing any
    /// previous registration of those tables.
    pub fn register(&self, format: Arc<ProtobufStorageFormat>) {
        let ids: Vec<TableId> = match format.owner() {
            crate::StorageOwner::Table(table) => vec![table.id],
            crate::StorageOwner::Group(group) => group.members().iter().map(|t| t.id).collect(),
        };
        let mut formats = self.formats.write();
        for id in ids {
            formats.insert(id, Arc::clone(&format));
        }
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.formats.read().len()
    }

    /// Whether no table is registered.
    pub fn is_empty(&self) -> bool {
        self.formats.read().is_empty()
    }
}

impl ConverterResolver for FormatRegistry {
    fn resolve(&self, table_id: TableId) -> Option<Arc<RowConverter>> {
        let format = self.formats.read().get(&table_id).cloned()?;
        format.resolve(table_id)
    }
}

/// Frames rows of one storage format as `[table id][table message]`.
pub struct ProtobufValueCoder {
    format: Arc<ProtobufStorageFormat>,
    resolver: Option<Arc<dyn ConverterResolver>>,
}

impl std::fmt::Debug for ProtobufValueCoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtobufValueCoder")
            .field("owner", &self.format.owner().name())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl ProtobufValueCoder {
    /// Creates a coder for the rows of `format`.
    pub fn new(format: Arc<ProtobufStorageFormat>) -> Self {
        Self { format, resolver: None }
    }

    /// Resolves converters for [`display`](ValueCoder::display) through
    /// `resolver` instead of this coder's own format.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ConverterResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Resolver used for display, if one was set.
    pub fn resolver(&self) -> Option<&Arc<dyn ConverterResolver>> {
        self.resolver.as_ref()
    }

    /// The format rows are framed for.
    pub fn format(&self) -> &Arc<ProtobufStorageFormat> {
        &self.format
    }

    fn display_row(&self, buf: &ValueBuffer) -> Option<String> {
        let (table_id, body) = buf.split_frame().ok()?;
        let converter = match &self.resolver {
            Some(resolver) => resolver.resolve(table_id)?,
            None => self.format.resolve(table_id)?,
        };
        let table = converter.table_converter(table_id)?;
        let message = DynamicMessage::decode(table.message(), body).ok()?;
        let row = table.decode(&message).ok()?;
        let values: Vec<String> = row.values.iter().map(ToString::to_string).collect();
        Some(format!("{}({})", table.table().qualified_name(), values.join(", ")))
    }
}

impl ValueCoder for ProtobufValueCoder {
    fn put(&self, row: &Row, out: &mut ValueBuffer) -> Result<()> {
        let converter = self.format.converter()?;
        let message = converter.encode_table(row).context(ConversionSnafu)?;
        out.put_u32(row.table_id.value());
        message.encode(&mut out.bytes);
        Ok(())
    }

    fn get(&self, buf: &ValueBuffer) -> Result<Row> {
        let (table_id, body) = buf.split_frame()?;
        let converter = self.format.converter()?;
        let Some(table) = converter.table_converter(table_id) else {
            let owner = self.format.owner().name();
            error!(owner = %owner, found = %table_id, "Stored frame names a table outside its owner");
            return Err(StoreError::TableIdMismatch { owner, found: table_id });
        };
        let message = DynamicMessage::decode(table.message(), body).context(WireSnafu).context(ConversionSnafu)?;
        table.decode(&message).context(ConversionSnafu)
    }

    fn display(&self, buf: &ValueBuffer, out: &mut String) {
        if let Some(rendered) = self.display_row(buf) {
            out.push_str(&rendered);
            return;
        }
        let max = self.format.config().display_max_bytes;
        let bytes = buf.as_bytes();
        out.push_str("0x");
        for byte in bytes.iter().take(max) {
            let _ = write!(out, "{byte:02x}");
        }
        if bytes.len() > max {
            let _ = write!(out, "...({} bytes)", bytes.len());
        }
    }
}
