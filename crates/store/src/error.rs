//! Error types for row storage.

use snafu::{Location, Snafu};
use tessera_rowformat::ConversionError;
use tessera_types::{ErrorCode, RowError, TableId};

/// Result type alias for storage operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors raised while packing, expanding or storing rows.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// Converting between a row and its message failed.
    #[snafu(display("Row conversion failed at {location}: {source}"))]
    Conversion {
        /// The underlying conversion error.
        source: ConversionError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Converting between a row and its flat form failed.
    #[snafu(display("Flat row conversion failed at {location}: {source}"))]
    FlatRow {
        /// The underlying row error.
        source: RowError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The backend does not support the requested operation.
    #[snafu(display("{backend} storage does not support {operation}"))]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// Requested operation.
        operation: &'static str,
    },

    /// A stored value is too short to hold its frame header.
    #[snafu(display("Stored value of {len} bytes is shorter than its {needed} byte frame header"))]
    Truncated {
        /// Length of the stored value.
        len: usize,
        /// Length of the frame header.
        needed: usize,
    },

    /// A stored frame names a table its converter does not cover.
    #[snafu(display("Stored frame belongs to {found}, which {owner} does not cover"))]
    TableIdMismatch {
        /// Owner the converter was built for.
        owner: String,
        /// Table id read from the frame.
        found: TableId,
    },

    /// A table is not part of the storage owner.
    #[snafu(display("{table_id} is not stored by {owner}"))]
    UnknownTable {
        /// Owning table or group.
        owner: String,
        /// Requested table.
        table_id: TableId,
    },
}

impl StoreError {
    /// Returns the machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Conversion { source, .. } => source.code(),
            Self::FlatRow { source, .. } => source.code(),
            Self::Unsupported { .. } => ErrorCode::StorageUnsupported,
            Self::Truncated { .. } => ErrorCode::StorageFraming,
            Self::TableIdMismatch { .. } => ErrorCode::InternalConsistency,
            Self::UnknownTable { .. } => ErrorCode::ValueMismatch,
        }
    }

    /// Whether stored data contradicts the converter that reads it.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.code().is_internal()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id_mismatch_is_internal() {
        let err = StoreError::TableIdMismatch { owner: "shop.orders".to_string(), found: TableId::new(9) };
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "Stored frame belongs to table:9, which shop.orders does not cover");
    }

    #[test]
    fn test_unsupported_code() {
        let err = StoreError::Unsupported { backend: "memory", operation: "legacy rows" };
        assert_eq!(err.code(), ErrorCode::StorageUnsupported);
        assert!(!err.is_internal());
        assert_eq!(err.to_string(), "memory storage does not support legacy rows");
    }

    #[test]
    fn test_conversion_code_passes_through() {
        let err = StoreError::Conversion {
            source: ConversionError::InvalidGroupMessage { message_type: "shop._Group".to_string(), populated: 0 },
            location: snafu::location!(),
        };
        assert!(err.is_internal());
    }
}
