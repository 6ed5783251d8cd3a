//! Wire schema and message errors.

use snafu::{Location, Snafu};
use tessera_types::ErrorCode;

use crate::schema::FieldKind;

/// Errors raised while compiling wire schemas and building or parsing messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WireError {
    /// Bytes did not parse as the expected message type.
    #[snafu(display("Failed to decode {message_type}: {source}"))]
    Decode {
        /// Fully qualified name of the expected message type.
        message_type: String,
        /// The parser's diagnostic.
        source: prost::DecodeError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The wire schema is internally inconsistent.
    #[snafu(display("Invalid wire schema: {reason}"))]
    InvalidSchema {
        /// What is wrong.
        reason: String,
    },

    /// A message type name does not resolve.
    #[snafu(display("Wire schema has no message {name}"))]
    UnknownMessage {
        /// Requested name.
        name: String,
    },

    /// A field number is not declared by the message type.
    #[snafu(display("{message_type} has no field {number}"))]
    UnknownField {
        /// Fully qualified message type name.
        message_type: String,
        /// Requested field number.
        number: u32,
    },

    /// A value does not fit the field's declared kind.
    #[snafu(display("Field {field} is {expected}, cannot hold {found}"))]
    KindMismatch {
        /// Field name.
        field: String,
        /// Declared kind.
        expected: FieldKind,
        /// Kind of the supplied value.
        found: &'static str,
    },
}

impl WireError {
    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Decode { .. } => ErrorCode::WireDecode,
            Self::InvalidSchema { .. } => ErrorCode::SchemaInvalid,
            Self::UnknownMessage { .. } | Self::UnknownField { .. } | Self::KindMismatch { .. } => {
                ErrorCode::SchemaMismatch
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = WireError::InvalidSchema { reason: "x".to_string() };
        assert_eq!(err.code(), ErrorCode::SchemaInvalid);
        let err = WireError::KindMismatch {
            field: "id".to_string(),
            expected: FieldKind::Sint64,
            found: "string",
        };
        assert_eq!(err.to_string(), "Field id is sint64, cannot hold string");
        assert_eq!(err.code(), ErrorCode::SchemaMismatch);
    }
}
