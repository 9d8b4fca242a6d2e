//! # wiresight-core
//!
//! A library for decoding raw Protocol Buffer payloads into a structured,
//! inspectable field tree.
//!
//! This crate provides the core functionality for:
//! - Parsing payload text (hex or base64) into bytes
//! - Schema-less decoding using only the wire format, with heuristic
//!   classification of length-delimited payloads
//! - Compiling `.proto` source text into a schema registry
//! - Schema-based decoding with field names and declared types
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`input`]: Payload text parsing (hex/base64)
//! - [`wire`]: Byte cursor and schema-less wire format decoding
//! - [`schema`]: Schema registry and schema-based decoding
//! - [`field`]: The shared decoded field tree model
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use wiresight_core::{input, wire};
//!
//! // Field 1: varint 150
//! let bytes = input::parse_payload_text("08 96 01")?;
//! let fields = wire::decode(&bytes)?;
//!
//! assert_eq!(fields[0].field_number, Some(1));
//! assert_eq!(fields[0].field_type, "varint");
//! # Ok::<(), wiresight_core::Error>(())
//! ```
//!
//! With a schema:
//!
//! ```
//! use wiresight_core::{input, ProtoSource, SchemaRegistry};
//!
//! let registry = SchemaRegistry::from_sources(&[ProtoSource::new(
//!     "person.proto",
//!     r#"syntax = "proto3"; message Person { string name = 1; int32 id = 2; }"#,
//! )])?;
//!
//! let bytes = input::parse_payload_text("0a044a6f686e107b")?;
//! let fields = registry.decode(&bytes, Some("Person"))?;
//!
//! assert_eq!(fields[0].name.as_deref(), Some("name"));
//! # Ok::<(), wiresight_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod field;
pub mod input;
pub mod schema;
pub mod wire;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use field::{DecodedField, FieldValue, WireType};
pub use schema::{ProtoSource, SchemaRegistry};
pub use wire::ByteCursor;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
