//! B-tree storage description.

use std::sync::Arc;

use tessera_proto::WireSchema;
use tessera_types::{ProtobufFormatType, Row, RowFormatConfig};

use super::RowStorageDescription;
use crate::{
    backend::BTreeBackend,
    coder::{ConverterResolver, ProtobufValueCoder, ValueBuffer, ValueCoder},
    error::Result,
    format::ProtobufStorageFormat,
    owner::StorageOwner,
};

/// Stores rows as `[table id][table message]` frames in a [`BTreeBackend`].
#[derive(Debug)]
pub struct BTreeStorageDescription {
    coder: ProtobufValueCoder,
}

impl BTreeStorageDescription {
    /// Creates a description for `owner`.
    pub fn new(
        owner: impl Into<StorageOwner>,
        format_type: ProtobufFormatType,
        schema: Arc<WireSchema>,
        config: RowFormatConfig,
    ) -> Self {
        let format = Arc::new(ProtobufStorageFormat::new(owner, format_type, schema, config));
        Self { coder: ProtobufValueCoder::new(format) }
    }

    /// Resolves converters for [`display`](Self::display) through `resolver`.
    #[must_use]
    pub fn with_resolver(self, resolver: Arc<dyn ConverterResolver>) -> Self {
        Self { coder: self.coder.with_resolver(resolver) }
    }

    /// The value coder registered with the B-tree.
    pub fn coder(&self) -> &ProtobufValueCoder {
        &self.coder
    }

    /// Shared handle to the format, for registration with a resolver.
    pub fn shared_format(&self) -> Arc<ProtobufStorageFormat> {
        Arc::clone(self.coder.format())
    }

    /// Human-readable form of a stored value, falling back to raw bytes.
    pub fn display(&self, value: &ValueBuffer) -> String {
        let mut out = String::new();
        self.coder.display(value, &mut out);
        out
    }

    /// Packs `row` and stores it under `key`.
    ///
    /// # Errors
    ///
    /// Returns any packing or backend error.
    pub fn write_row(&self, backend: &dyn BTreeBackend, key: &[u8], row: &Row) -> Result<()> {
        backend.store(key, &self.pack_row(row)?)
    }

    /// Fetches and expands the row under `key`.
    ///
    /// # Errors
    ///
    /// Returns any backend or expansion error.
    pub fn read_row(&self, backend: &dyn BTreeBackend, key: &[u8]) -> Result<Option<Row>> {
        backend.fetch(key)?.map(|value| self.expand_row(&value)).transpose()
    }
}

impl RowStorageDescription for BTreeStorageDescription {
    type Native = ValueBuffer;

    const BACKEND: &'static str = "b-tree";

    fn format(&self) -> &ProtobufStorageFormat {
        self.coder.format()
    }

    fn pack_row(&self, row: &Row) -> Result<ValueBuffer> {
        let mut buf = ValueBuffer::new();
        self.coder.put(row, &mut buf)?;
        Ok(buf)
    }

    fn expand_row(&self, native: &ValueBuffer) -> Result<Row> {
        self.coder.get(native)
    }

    /// The copy keeps this description's display resolver.
    fn clone_for_owner(&self, owner: StorageOwner) -> Self {
        let format = Arc::new(self.format().clone_for(owner));
        let coder = ProtobufValueCoder::new(format);
        let coder = match self.coder.resolver() {
            Some(resolver) => coder.with_resolver(Arc::clone(resolver)),
            None => coder,
        };
        Self { coder }
    }
}
