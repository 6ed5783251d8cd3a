//! Persisted wire schema messages.
//!
//! A wire schema is generated outside this workspace from a table or
//! table group definition and stored alongside it. It is itself a protobuf
//! message, so it is described here with hand-written `prost` types rather
//! than a build step.

use prost::Message;

/// Protobuf scalar or message kind of a wire field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FieldKind {
    /// `bool`
    Bool = 0,
    /// `int32`
    Int32 = 1,
    /// `sint32`
    Sint32 = 2,
    /// `uint32`
    Uint32 = 3,
    /// `int64`
    Int64 = 4,
    /// `sint64`
    Sint64 = 5,
    /// `uint64`
    Uint64 = 6,
    /// `float`
    Float = 7,
    /// `double`
    Double = 8,
    /// `string`
    String = 9,
    /// `bytes`
    Bytes = 10,
    /// Nested message named by the field's `type_name`.
    Message = 11,
}

impl FieldKind {
    /// Protobuf type keyword.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Sint32 => "sint32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Sint64 => "sint64",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete wire schema: one package of message types.
#[derive(Clone, PartialEq, Message)]
pub struct WireSchemaProto {
    /// Package name, usually the schema (database) name.
    #[prost(string, tag = "1")]
    pub package: String,

    /// Message types in declaration order.
    #[prost(message, repeated, tag = "2")]
    pub messages: Vec<MessageProto>,
}

/// One message type.
#[derive(Clone, PartialEq, Message)]
pub struct MessageProto {
    /// Simple message name.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Fields in declaration order.
    #[prost(message, repeated, tag = "2")]
    pub fields: Vec<FieldProto>,

    /// Table or group annotations.
    #[prost(message, optional, tag = "3")]
    pub options: Option<TableOptions>,
}

/// Message-level annotations.
#[derive(Clone, PartialEq, Message)]
pub struct TableOptions {
    /// Table name, empty for the group message.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Schema (database) name.
    #[prost(string, tag = "2")]
    pub schema: String,

    /// Stable identity of the table, empty for the group message.
    #[prost(string, tag = "3")]
    pub uuid: String,

    /// Marks the message that wraps one row of any member table.
    #[prost(bool, tag = "4")]
    pub is_group: bool,

    /// Next unused field number, kept by the generator across regenerations.
    #[prost(int32, tag = "5")]
    pub next_field: i32,
}

/// One field.
#[derive(Clone, PartialEq, Message)]
pub struct FieldProto {
    /// Field name.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Field number.
    #[prost(uint32, tag = "2")]
    pub number: u32,

    /// Scalar kind, or [`FieldKind::Message`].
    #[prost(enumeration = "FieldKind", tag = "3")]
    pub kind: i32,

    /// Message type name for [`FieldKind::Message`] fields.
    #[prost(string, tag = "4")]
    pub type_name: String,

    /// Column or table annotations.
    #[prost(message, optional, tag = "5")]
    pub options: Option<ColumnOptions>,
}

/// Field-level annotations.
///
/// In a table message, `uuid` names the bound column, or `null_for_field`
/// marks the field as the null indicator of another field. In the group
/// message, `uuid` names the member table the field wraps.
#[derive(Clone, PartialEq, Message)]
pub struct ColumnOptions {
    /// Column or table name.
    #[prost(string, tag = "1")]
    pub name: String,

    /// SQL type of the column, informational.
    #[prost(string, tag = "2")]
    pub sql_type: String,

    /// Stable identity of the column or member table.
    #[prost(string, tag = "3")]
    pub uuid: String,

    /// Number of the field this field is the null indicator for.
    #[prost(int32, optional, tag = "4")]
    pub null_for_field: Option<i32>,

    /// Scale of a decimal column.
    #[prost(int32, optional, tag = "5")]
    pub decimal_scale: Option<i32>,
}

impl FieldProto {
    /// Scalar field without annotations.
    pub fn scalar(name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        Self { name: name.into(), number, kind: kind as i32, type_name: String::new(), options: None }
    }

    /// Field holding a nested message.
    pub fn message(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number,
            kind: FieldKind::Message as i32,
            type_name: type_name.into(),
            options: None,
        }
    }

    /// Attaches annotations.
    #[must_use]
    pub fn with_options(mut self, options: ColumnOptions) -> Self {
        self.options = Some(options);
        self
    }
}
