//! Schema registry and schema-based decoding.
//!
//! This module compiles `.proto` source text into a resolved
//! [`prost_reflect::DescriptorPool`] and decodes payloads against a chosen
//! message type, producing the same [`DecodedField`] tree as the schema-less
//! decoder but annotated with field names, declared types, and nested message
//! names.
//!
//! ## Lifecycle
//!
//! A [`SchemaRegistry`] is built once from a set of sources and is immutable
//! afterwards. All sources are compiled into one shared namespace, so
//! cross-file imports and package-qualified references resolve. When the set
//! of proto sources changes, a new registry is constructed; there is no
//! incremental add.

use crate::error::{Error, Result};
use crate::field::{hex_string, DecodedField, FieldValue};
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, ReflectMessage, Value,
};
use protox::file::{File, FileResolver, GoogleFileResolver};
use protox::Compiler;
use std::collections::HashMap;
use tracing::{debug, trace};

/// A single `.proto` source: a logical name plus its text.
///
/// The name is used for import resolution between sources and in error
/// messages; it does not need to correspond to a file on disk.
#[derive(Debug, Clone)]
pub struct ProtoSource {
    /// Logical file name, e.g. `person.proto`
    pub name: String,
    /// The `.proto` source text
    pub text: String,
}

impl ProtoSource {
    /// Creates a new proto source.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Resolves imports against the in-memory source set, falling back to the
/// bundled Google well-known types (`google/protobuf/*.proto`).
struct SourceSetResolver {
    files: HashMap<String, String>,
    google: GoogleFileResolver,
}

impl FileResolver for SourceSetResolver {
    fn open_file(&self, name: &str) -> std::result::Result<File, protox::Error> {
        match self.files.get(name) {
            Some(source) => File::from_source(name, source),
            None => self.google.open_file(name),
        }
    }
}

/// An immutable namespace of message types compiled from `.proto` sources.
///
/// Every message type (including nested ones) is registered under both its
/// fully-qualified dotted name and its simple name. When two types share a
/// simple name, the later registration wins for that key; fully-qualified
/// names remain unambiguous.
#[derive(Debug)]
pub struct SchemaRegistry {
    types: HashMap<String, MessageDescriptor>,
    names: Vec<String>,
}

impl SchemaRegistry {
    /// Compiles `.proto` sources into a registry.
    ///
    /// Fails with [`Error::ProtoParse`] naming the offending source if any
    /// source's grammar is invalid or a reference does not resolve, and with
    /// [`Error::NoMessageTypes`] if the sources declare no message types.
    pub fn from_sources(sources: &[ProtoSource]) -> Result<Self> {
        let resolver = SourceSetResolver {
            files: sources
                .iter()
                .map(|s| (s.name.clone(), s.text.clone()))
                .collect(),
            google: GoogleFileResolver::new(),
        };

        let mut compiler = Compiler::with_file_resolver(resolver);
        compiler.include_imports(true);

        for source in sources {
            debug!("compiling proto source: {}", source.name);
            compiler
                .open_file(&source.name)
                .map_err(|e| Error::proto_parse(&source.name, e.to_string()))?;
        }

        let pool = compiler.descriptor_pool();

        let mut types = HashMap::new();
        let mut names = Vec::new();
        for message in pool.all_messages() {
            trace!(
                "found message type: {} ({})",
                message.name(),
                message.full_name()
            );
            register(&mut types, &mut names, message.full_name(), &message);
            register(&mut types, &mut names, message.name(), &message);
        }

        if names.is_empty() {
            return Err(Error::NoMessageTypes);
        }

        debug!("registered {} message type name(s)", names.len());
        Ok(Self { types, names })
    }

    /// Returns the registered type names in registration order, for use by
    /// external selection UIs.
    pub fn message_type_names(&self) -> &[String] {
        &self.names
    }

    /// Decodes a payload against a registered message type.
    ///
    /// When `message_type` is `None` the first registered type is used.
    /// Malformed bytes relative to the schema surface as
    /// [`Error::SchemaDecode`] and are never recovered.
    pub fn decode(&self, buffer: &[u8], message_type: Option<&str>) -> Result<Vec<DecodedField>> {
        let name = match message_type {
            Some(name) => name,
            // Construction guarantees at least one registered name
            None => self.names[0].as_str(),
        };

        let descriptor = self
            .types
            .get(name)
            .ok_or_else(|| Error::unknown_message_type(name, self.names.iter().cloned()))?;

        debug!(
            "decoding {} bytes as {}",
            buffer.len(),
            descriptor.full_name()
        );

        let message = DynamicMessage::decode(descriptor.clone(), buffer)
            .map_err(|e| Error::schema_decode(name, e))?;

        Ok(convert_message(&message))
    }
}

fn register(
    types: &mut HashMap<String, MessageDescriptor>,
    names: &mut Vec<String>,
    key: &str,
    descriptor: &MessageDescriptor,
) {
    if types.insert(key.to_string(), descriptor.clone()).is_none() {
        names.push(key.to_string());
    }
}

/// Convert a decoded message into the field tree, walking declared fields in
/// declaration order. Absent fields are omitted entirely ("missing means
/// default"), never emitted with a zero value.
fn convert_message(message: &DynamicMessage) -> Vec<DecodedField> {
    let descriptor = message.descriptor();
    let mut fields = Vec::new();

    for fd in descriptor.fields() {
        if !message.has_field(&fd) {
            continue;
        }
        // Maps are out of scope for this decoder
        if fd.is_map() {
            continue;
        }
        fields.push(convert_field(&fd, message.get_field(&fd).as_ref()));
    }

    fields
}

fn convert_field(fd: &FieldDescriptor, value: &Value) -> DecodedField {
    if fd.is_list() {
        let items = match value {
            Value::List(items) => items.as_slice(),
            _ => &[],
        };
        return match fd.kind() {
            Kind::Message(nested) => {
                let wrappers = items
                    .iter()
                    .map(|item| repeated_message_element(&nested, item))
                    .collect();
                DecodedField::typed(
                    fd.number(),
                    fd.name(),
                    "repeated_message",
                    FieldValue::Fields(wrappers),
                )
            }
            kind => DecodedField::typed(
                fd.number(),
                fd.name(),
                format!("repeated_{}", kind_type_name(&kind)),
                FieldValue::Scalars(items.iter().map(|item| scalar_value(fd, item)).collect()),
            ),
        };
    }

    match fd.kind() {
        Kind::Message(nested) => {
            let children = match value {
                Value::Message(inner) => convert_message(inner),
                _ => Vec::new(),
            };
            let mut field = DecodedField::typed(
                fd.number(),
                fd.name(),
                "message",
                FieldValue::Fields(children),
            );
            field.message = Some(nested.name().to_string());
            field
        }
        kind => DecodedField::typed(
            fd.number(),
            fd.name(),
            kind_type_name(&kind),
            scalar_value(fd, value),
        ),
    }
}

/// One element of a repeated message field: a wrapper node with the nested
/// conversion as its value.
fn repeated_message_element(nested: &MessageDescriptor, item: &Value) -> DecodedField {
    let children = match item {
        Value::Message(inner) => convert_message(inner),
        _ => Vec::new(),
    };
    DecodedField {
        field_number: None,
        name: None,
        wire_type: None,
        field_type: "message".to_string(),
        value: FieldValue::Fields(children),
        message: Some(nested.name().to_string()),
        byte_range: None,
    }
}

/// Convert a scalar value, keeping 64-bit integers as decimal strings.
fn scalar_value(fd: &FieldDescriptor, value: &Value) -> FieldValue {
    match value {
        Value::Bool(v) => FieldValue::Bool(*v),
        Value::I32(v) => FieldValue::Int(i64::from(*v)),
        Value::U32(v) => FieldValue::UInt(u64::from(*v)),
        Value::I64(v) => FieldValue::Text(v.to_string()),
        Value::U64(v) => FieldValue::Text(v.to_string()),
        Value::F32(v) => FieldValue::Float(f64::from(*v)),
        Value::F64(v) => FieldValue::Float(*v),
        Value::String(v) => FieldValue::Text(v.clone()),
        Value::Bytes(v) => FieldValue::Text(hex_string(v)),
        Value::EnumNumber(n) => match fd.kind() {
            Kind::Enum(e) => e
                .get_value(*n)
                .map(|v| FieldValue::Text(v.name().to_string()))
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            _ => FieldValue::Text(n.to_string()),
        },
        // Composite values are routed through convert_field, never here
        Value::Message(_) | Value::List(_) | Value::Map(_) => {
            unreachable!("composite value in scalar position")
        }
    }
}

/// The declared proto type name for a field kind.
fn kind_type_name(kind: &Kind) -> String {
    match kind {
        Kind::Double => "double".to_string(),
        Kind::Float => "float".to_string(),
        Kind::Int32 => "int32".to_string(),
        Kind::Int64 => "int64".to_string(),
        Kind::Uint32 => "uint32".to_string(),
        Kind::Uint64 => "uint64".to_string(),
        Kind::Sint32 => "sint32".to_string(),
        Kind::Sint64 => "sint64".to_string(),
        Kind::Fixed32 => "fixed32".to_string(),
        Kind::Fixed64 => "fixed64".to_string(),
        Kind::Sfixed32 => "sfixed32".to_string(),
        Kind::Sfixed64 => "sfixed64".to_string(),
        Kind::Bool => "bool".to_string(),
        Kind::String => "string".to_string(),
        Kind::Bytes => "bytes".to_string(),
        Kind::Enum(e) => e.name().to_string(),
        Kind::Message(m) => m.name().to_string(),
    }
}
