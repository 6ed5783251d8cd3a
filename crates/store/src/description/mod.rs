//! Storage descriptions: the per-owner bridge between rows and a backend's
//! native value type.
//!
//! Every description wraps a shared [`ProtobufStorageFormat`] and differs
//! only in the value type it hands to its backend and in whether it accepts
//! legacy flat rows.

mod btree;
mod kv;
mod memory;

pub use btree::BTreeStorageDescription;
pub use kv::KvStorageDescription;
pub use memory::MemoryStorageDescription;
use tessera_types::{FlatRow, Row};

use crate::{error::Result, format::ProtobufStorageFormat, owner::StorageOwner};

/// Packs and expands the rows of one table or group for one backend.
pub trait RowStorageDescription: Send + Sync {
    /// Value type the backend stores.
    type Native;

    /// Backend name used in diagnostics.
    const BACKEND: &'static str;

    /// The shared format.
    fn format(&self) -> &ProtobufStorageFormat;

    /// Encodes a row as a native value.
    ///
    /// # Errors
    ///
    /// Returns an error if the converter cannot be built or the row does not
    /// encode.
    fn pack_row(&self, row: &Row) -> Result<Self::Native>;

    /// Decodes a native value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not parse as the expected message
    /// or does not decode. A default row is never substituted.
    fn expand_row(&self, native: &Self::Native) -> Result<Row>;

    /// Encodes a legacy flat row as a native value.
    ///
    /// # Errors
    ///
    /// Returns an error if the flat row belongs to no table of the owner, is
    /// malformed, or does not encode.
    fn pack_legacy_row(&self, flat: &FlatRow) -> Result<Self::Native> {
        let row = self.format().flat_to_row(flat)?;
        self.pack_row(&row)
    }

    /// Decodes a native value to a legacy flat row.
    ///
    /// # Errors
    ///
    /// Returns any error from [`expand_row`](Self::expand_row) or from
    /// flattening the row.
    fn expand_legacy_row(&self, native: &Self::Native) -> Result<FlatRow> {
        let row = self.expand_row(native)?;
        self.format().row_to_flat(&row)
    }

    /// Copy of this description for a new owner. The copy never shares the
    /// cached converter.
    #[must_use]
    fn clone_for_owner(&self, owner: StorageOwner) -> Self
    where
        Self: Sized;
}
