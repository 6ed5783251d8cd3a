//! Compiled wire schemas.
//!
//! [`WireSchema::compile`] turns a persisted [`WireSchemaProto`] into
//! immutable, shareable descriptors. Compilation resolves nested message
//! references and parses the table and column annotations once, so
//! converters never look at raw annotation strings.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use prost::Message;
use snafu::ResultExt;
use uuid::Uuid;

use crate::{
    error::{DecodeSnafu, WireError},
    schema::{ColumnOptions, FieldKind, FieldProto, MessageProto, TableOptions, WireSchemaProto},
};

/// Largest field number protobuf allows.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Largest decimal scale an annotation may carry.
const MAX_DECIMAL_SCALE: i32 = 28;

/// Parsed message-level annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAnnotation {
    /// Table name.
    pub name: String,
    /// Schema name.
    pub schema: String,
    /// Table identity, absent on the group message.
    pub uuid: Option<Uuid>,
    /// Whether this is the designated group message.
    pub is_group: bool,
}

/// A compiled field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    number: u32,
    kind: FieldKind,
    message_type: Option<MessageDescriptor>,
    uuid: Option<Uuid>,
    null_for_field: Option<u32>,
    decimal_scale: Option<u8>,
}

impl FieldDescriptor {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Declared kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Nested message type of a [`FieldKind::Message`] field.
    pub fn message_type(&self) -> Option<&MessageDescriptor> {
        self.message_type.as_ref()
    }

    /// Identity of the column (table messages) or member table (group message).
    pub fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    /// Number of the field this one is the null indicator for.
    pub fn null_for_field(&self) -> Option<u32> {
        self.null_for_field
    }

    /// Declared decimal scale.
    pub fn decimal_scale(&self) -> Option<u8> {
        self.decimal_scale
    }
}

#[derive(Debug)]
struct MessageInner {
    name: String,
    full_name: String,
    fields: Vec<FieldDescriptor>,
    by_number: HashMap<u32, usize>,
    table: Option<TableAnnotation>,
}

/// A compiled message type. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    inner: Arc<MessageInner>,
}

impl MessageDescriptor {
    /// Simple name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Package-qualified name.
    pub fn full_name(&self) -> &str {
        &self.inner.full_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.inner.fields
    }

    /// Field by number.
    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.inner.by_number.get(&number).map(|&i| &self.inner.fields[i])
    }

    /// Table annotations, if any.
    pub fn table(&self) -> Option<&TableAnnotation> {
        self.inner.table.as_ref()
    }

    /// Whether this is the designated group message.
    pub fn is_group(&self) -> bool {
        self.inner.table.as_ref().is_some_and(|t| t.is_group)
    }

    /// Identity of the table this message describes.
    pub fn table_uuid(&self) -> Option<Uuid> {
        self.inner.table.as_ref().and_then(|t| t.uuid)
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.full_name == other.inner.full_name
    }
}

/// A compiled, validated wire schema.
#[derive(Debug, Clone)]
pub struct WireSchema {
    proto: WireSchemaProto,
    messages: Vec<MessageDescriptor>,
    by_name: HashMap<String, usize>,
}

impl WireSchema {
    /// Compiles and validates a wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidSchema`] if message names or field numbers
    /// repeat, a field kind is unknown, a message reference does not resolve
    /// or is recursive, or an annotation is malformed.
    pub fn compile(proto: WireSchemaProto) -> Result<Self, WireError> {
        let (messages, by_name) = {
            let mut protos = HashMap::with_capacity(proto.messages.len());
            for message in &proto.messages {
                if message.name.is_empty() {
                    return invalid("message with an empty name");
                }
                if protos.insert(message.name.as_str(), message).is_some() {
                    return invalid(format!("message {} is declared twice", message.name));
                }
            }

            let mut compiler = Compiler {
                package: &proto.package,
                protos: &protos,
                built: HashMap::new(),
                visiting: HashSet::new(),
            };
            let mut messages = Vec::with_capacity(proto.messages.len());
            let mut by_name = HashMap::with_capacity(proto.messages.len());
            for message in &proto.messages {
                by_name.insert(message.name.clone(), messages.len());
                messages.push(compiler.build(&message.name)?);
            }
            (messages, by_name)
        };

        Ok(Self { proto, messages, by_name })
    }

    /// Decodes a persisted schema and compiles it.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Decode`] if the bytes do not parse, or any error
    /// from [`WireSchema::compile`].
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let proto = WireSchemaProto::decode(bytes)
            .context(DecodeSnafu { message_type: "tessera.WireSchemaProto" })?;
        Self::compile(proto)
    }

    /// Serializes the schema for persistence.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.proto.encode_to_vec()
    }

    /// The persisted form.
    pub fn proto(&self) -> &WireSchemaProto {
        &self.proto
    }

    /// Package name.
    pub fn package(&self) -> &str {
        &self.proto.package
    }

    /// Message types in declaration order.
    pub fn messages(&self) -> &[MessageDescriptor] {
        &self.messages
    }

    /// Message type by simple or qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownMessage`] if no message has that name.
    pub fn message(&self, name: &str) -> Result<&MessageDescriptor, WireError> {
        let simple = strip_package(&self.proto.package, name);
        self.by_name
            .get(simple)
            .map(|&i| &self.messages[i])
            .ok_or_else(|| WireError::UnknownMessage { name: name.to_string() })
    }

    /// Message type annotated with the given table identity.
    pub fn table_message(&self, uuid: Uuid) -> Option<&MessageDescriptor> {
        self.messages.iter().find(|m| m.table_uuid() == Some(uuid))
    }
}

struct Compiler<'a> {
    package: &'a str,
    protos: &'a HashMap<&'a str, &'a MessageProto>,
    built: HashMap<String, MessageDescriptor>,
    visiting: HashSet<String>,
}

impl Compiler<'_> {
    fn build(&mut self, name: &str) -> Result<MessageDescriptor, WireError> {
        if let Some(done) = self.built.get(name) {
            return Ok(done.clone());
        }
        let Some(proto) = self.protos.get(name).copied() else {
            return Err(WireError::UnknownMessage { name: name.to_string() });
        };
        if !self.visiting.insert(name.to_string()) {
            return invalid(format!("message {name} contains itself"));
        }

        let mut fields = Vec::with_capacity(proto.fields.len());
        let mut by_number = HashMap::with_capacity(proto.fields.len());
        for field in &proto.fields {
            if field.number == 0 || field.number > MAX_FIELD_NUMBER {
                return invalid(format!("{name}.{} has field number {}", field.name, field.number));
            }
            if by_number.insert(field.number, fields.len()).is_some() {
                return invalid(format!("{name} reuses field number {}", field.number));
            }
            fields.push(self.build_field(name, field)?);
        }

        for field in &fields {
            if let Some(target) = field.null_for_field {
                if !by_number.contains_key(&target) || target == field.number {
                    return invalid(format!(
                        "{name}.{} is a null indicator for missing field {target}",
                        field.name
                    ));
                }
            }
        }

        let table = proto.options.as_ref().map(|o| table_annotation(name, o)).transpose()?;
        let full_name = if self.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.package)
        };
        let descriptor = MessageDescriptor {
            inner: Arc::new(MessageInner {
                name: name.to_string(),
                full_name,
                fields,
                by_number,
                table,
            }),
        };

        self.visiting.remove(name);
        self.built.insert(name.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    fn build_field(&mut self, message: &str, field: &FieldProto) -> Result<FieldDescriptor, WireError> {
        let Ok(kind) = FieldKind::try_from(field.kind) else {
            return invalid(format!("{message}.{} has unknown kind {}", field.name, field.kind));
        };
        let message_type = if kind == FieldKind::Message {
            let target = strip_package(self.package, &field.type_name);
            Some(self.build(target).map_err(|e| match e {
                WireError::UnknownMessage { name } => WireError::InvalidSchema {
                    reason: format!("{message}.{} refers to unknown message {name}", field.name),
                },
                other => other,
            })?)
        } else {
            None
        };

        let (uuid, null_for_field, decimal_scale) = match &field.options {
            Some(options) => column_annotation(message, &field.name, options)?,
            None => (None, None, None),
        };

        Ok(FieldDescriptor {
            name: field.name.clone(),
            number: field.number,
            kind,
            message_type,
            uuid,
            null_for_field,
            decimal_scale,
        })
    }
}

type ColumnAnnotation = (Option<Uuid>, Option<u32>, Option<u8>);

fn column_annotation(
    message: &str,
    field: &str,
    options: &ColumnOptions,
) -> Result<ColumnAnnotation, WireError> {
    let uuid = parse_uuid(&options.uuid, || format!("{message}.{field}"))?;
    let null_for_field = match options.null_for_field {
        Some(n) => match u32::try_from(n) {
            Ok(n) if n > 0 => Some(n),
            _ => return invalid(format!("{message}.{field} is a null indicator for field {n}")),
        },
        None => None,
    };
    let decimal_scale = match options.decimal_scale {
        Some(s) if (0..=MAX_DECIMAL_SCALE).contains(&s) => u8::try_from(s).ok(),
        Some(s) => return invalid(format!("{message}.{field} has decimal scale {s}")),
        None => None,
    };
    Ok((uuid, null_for_field, decimal_scale))
}

fn table_annotation(message: &str, options: &TableOptions) -> Result<TableAnnotation, WireError> {
    Ok(TableAnnotation {
        name: options.name.clone(),
        schema: options.schema.clone(),
        uuid: parse_uuid(&options.uuid, || message.to_string())?,
        is_group: options.is_group,
    })
}

fn parse_uuid(raw: &str, owner: impl FnOnce() -> String) -> Result<Option<Uuid>, WireError> {
    if raw.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|e| WireError::InvalidSchema { reason: format!("{} has uuid {raw:?}: {e}", owner()) })
}

fn strip_package<'a>(package: &str, name: &'a str) -> &'a str {
    let name = name.strip_prefix('.').unwrap_or(name);
    if package.is_empty() {
        return name;
    }
    name.strip_prefix(package).and_then(|rest| rest.strip_prefix('.')).unwrap_or(name)
}

fn invalid<T>(reason: impl Into<String>) -> Result<T, WireError> {
    Err(WireError::InvalidSchema { reason: reason.into() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn message(name: &str, fields: Vec<FieldProto>) -> MessageProto {
        MessageProto { name: name.to_string(), fields, options: None }
    }

    fn schema(messages: Vec<MessageProto>) -> WireSchemaProto {
        WireSchemaProto { package: "shop".to_string(), messages }
    }

    #[test]
    fn test_compile_resolves_nested_messages_in_any_order() {
        let proto = schema(vec![
            message("_Group", vec![FieldProto::message("orders", 1, ".shop.orders")]),
            message("orders", vec![FieldProto::scalar("id", 1, FieldKind::Sint64)]),
        ]);
        let compiled = WireSchema::compile(proto).unwrap();
        let group = compiled.message("_Group").unwrap();
        let nested = group.field(1).unwrap().message_type().unwrap();
        assert_eq!(nested.full_name(), "shop.orders");
        assert_eq!(nested, compiled.message("shop.orders").unwrap());
        assert_eq!(compiled.messages()[0].name(), "_Group");
    }

    #[test]
    fn test_compile_rejects_duplicate_field_numbers() {
        let proto = schema(vec![message(
            "t",
            vec![FieldProto::scalar("a", 1, FieldKind::Bool), FieldProto::scalar("b", 1, FieldKind::Bool)],
        )]);
        assert!(matches!(WireSchema::compile(proto), Err(WireError::InvalidSchema { .. })));
    }

    #[test]
    fn test_compile_rejects_recursion() {
        let proto = schema(vec![
            message("a", vec![FieldProto::message("b", 1, "b")]),
            message("b", vec![FieldProto::message("a", 1, "a")]),
        ]);
        let err = WireSchema::compile(proto).unwrap_err();
        assert!(err.to_string().contains("contains itself"), "{err}");
    }

    #[test]
    fn test_compile_rejects_unresolved_reference() {
        let proto = schema(vec![message("a", vec![FieldProto::message("b", 1, "missing")])]);
        let err = WireSchema::compile(proto).unwrap_err();
        assert!(err.to_string().contains("unknown message missing"), "{err}");
    }

    #[test]
    fn test_compile_rejects_unknown_kind() {
        let mut field = FieldProto::scalar("a", 1, FieldKind::Bool);
        field.kind = 99;
        let proto = schema(vec![message("a", vec![field])]);
        assert!(matches!(WireSchema::compile(proto), Err(WireError::InvalidSchema { .. })));
    }

    #[test]
    fn test_compile_rejects_dangling_null_indicator() {
        let indicator = FieldProto::scalar("_x_is_null", 2, FieldKind::Bool)
            .with_options(ColumnOptions { null_for_field: Some(7), ..ColumnOptions::default() });
        let proto = schema(vec![message("t", vec![FieldProto::scalar("x", 1, FieldKind::Bool), indicator])]);
        assert!(matches!(WireSchema::compile(proto), Err(WireError::InvalidSchema { .. })));
    }

    #[test]
    fn test_compile_rejects_bad_uuid() {
        let field = FieldProto::scalar("x", 1, FieldKind::Bool)
            .with_options(ColumnOptions { uuid: "nope".to_string(), ..ColumnOptions::default() });
        let proto = schema(vec![message("t", vec![field])]);
        let err = WireSchema::compile(proto).unwrap_err();
        assert!(err.to_string().contains("t.x has uuid"), "{err}");
    }

    #[test]
    fn test_annotations_are_parsed() {
        let uuid = Uuid::new_v4();
        let field = FieldProto::scalar("total", 3, FieldKind::Sint64).with_options(ColumnOptions {
            uuid: uuid.to_string(),
            decimal_scale: Some(2),
            ..ColumnOptions::default()
        });
        let mut t = message("t", vec![field]);
        t.options = Some(TableOptions { uuid: uuid.to_string(), ..TableOptions::default() });
        let compiled = WireSchema::compile(schema(vec![t])).unwrap();
        let t = compiled.table_message(uuid).unwrap();
        assert!(!t.is_group());
        let field = t.field(3).unwrap();
        assert_eq!(field.uuid(), Some(uuid));
        assert_eq!(field.decimal_scale(), Some(2));
        assert_eq!(field.kind(), FieldKind::Sint64);
    }

    #[test]
    fn test_schema_decode_roundtrip_and_garbage() {
        let proto = schema(vec![message("t", vec![FieldProto::scalar("x", 1, FieldKind::Bool)])]);
        let compiled = WireSchema::compile(proto).unwrap();
        let reloaded = WireSchema::decode(&compiled.encode_to_vec()).unwrap();
        assert_eq!(reloaded.proto(), compiled.proto());
        assert_eq!(reloaded.package(), "shop");

        let err = WireSchema::decode(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, WireError::Decode { .. }));
    }

    #[test]
    fn test_unknown_message_lookup() {
        let compiled = WireSchema::compile(schema(vec![])).unwrap();
        assert!(matches!(compiled.message("x"), Err(WireError::UnknownMessage { .. })));
    }
}
