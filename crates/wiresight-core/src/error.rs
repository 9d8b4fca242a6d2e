//! Error types for the wiresight-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use thiserror::Error;

/// Result type alias for wiresight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all wiresight operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Raw payload text is neither recognized hex nor base64
    #[error("invalid payload format: expected hex or base64 text")]
    InvalidInputFormat,

    /// Varint continuation exceeded the 64-bit ceiling
    #[error("malformed varint at offset {offset}: continuation exceeds 10 bytes")]
    MalformedVarint {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// A read requested more bytes than remain in the buffer
    #[error("not enough bytes left: requested {requested}, remaining {remaining}")]
    InsufficientBytes {
        /// Number of bytes requested
        requested: usize,
        /// Number of bytes actually remaining
        remaining: usize,
    },

    /// Deprecated group wire type encountered; structurally unparseable
    #[error("unsupported wire type {wire_type} ({name}) at field {field_number}: groups are deprecated and cannot be decoded")]
    UnsupportedWireType {
        /// The group wire type value (3 or 4)
        wire_type: u8,
        /// Name of the wire type (START_GROUP or END_GROUP)
        name: &'static str,
        /// Field number carried by the offending tag
        field_number: u32,
    },

    /// Wire type outside the defined enumeration
    #[error("unknown wire type: {wire_type}")]
    UnknownWireType {
        /// The unrecognized wire type value
        wire_type: u8,
    },

    /// Failed to parse a `.proto` source
    #[error("failed to parse proto source '{file}': {message}")]
    ProtoParse {
        /// Logical name of the offending source
        file: String,
        /// Description of the parse failure
        message: String,
    },

    /// Proto sources parsed but declared zero message types
    #[error("no message types found in the provided proto sources")]
    NoMessageTypes,

    /// Requested message type is not registered
    #[error("message type '{name}' not found; available types: {available}")]
    UnknownMessageType {
        /// The requested type name
        name: String,
        /// Comma-separated list of registered type names
        available: String,
    },

    /// Bytes inconsistent with the declared schema during typed decode
    #[error("failed to decode payload as '{message_type}': {source}")]
    SchemaDecode {
        /// The target message type name
        message_type: String,
        /// Underlying prost decode error
        #[source]
        source: prost::DecodeError,
    },
}

impl Error {
    /// Creates a new malformed varint error
    pub fn malformed_varint(offset: usize) -> Self {
        Self::MalformedVarint { offset }
    }

    /// Creates a new insufficient bytes error
    pub fn insufficient_bytes(requested: usize, remaining: usize) -> Self {
        Self::InsufficientBytes {
            requested,
            remaining,
        }
    }

    /// Creates a new proto parse error
    pub fn proto_parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProtoParse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates a new unknown message type error
    pub fn unknown_message_type(
        name: impl Into<String>,
        available: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::UnknownMessageType {
            name: name.into(),
            available: available
                .into_iter()
                .map(Into::into)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Creates a new schema decode error
    pub fn schema_decode(message_type: impl Into<String>, source: prost::DecodeError) -> Self {
        Self::SchemaDecode {
            message_type: message_type.into(),
            source,
        }
    }

    /// Returns true if this error is fatal to schema-less decoding.
    ///
    /// Group wire types abort the entire decode; every other wire-level
    /// failure degrades to a partial result instead.
    pub fn is_fatal_wire_error(&self) -> bool {
        matches!(self, Self::UnsupportedWireType { .. })
    }
}
