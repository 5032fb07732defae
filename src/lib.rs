// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]

//! # avro-infer
//!
//! Schema inference and schema-driven Avro binary encoding for
//! semi-structured records.
//!
//! ## Features
//!
//! - **Schema Inference**: one Avro schema valid for every record of a sequence
//! - **Exact Numbers**: `3.14` stays `"3.14"`; only exponent literals become doubles
//! - **Binary Codec**: Avro datums and object container files via `apache-avro`, both directions
//! - **Reader Schemas**: strict or best-effort resolution against another schema
//! - **JSON Lines**: streaming input and output
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use avro_infer::{infer_schema, parse_json, Encoder, InferenceOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let records = vec![
//!         parse_json(r#"{"id": 1, "price": 3.14}"#)?,
//!         parse_json(r#"{"id": 2, "tags": ["a"]}"#)?,
//!     ];
//!
//!     let schema = infer_schema(&records, &InferenceOptions::default())?;
//!     println!("{}", schema.to_json_pretty());
//!
//!     let encoder = Encoder::new(schema)?;
//!     for record in &records {
//!         let bytes = encoder.encode(record)?;
//!         // Ship the datum
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      JSON Lines / Value                         │
//! │  parse_json() → Value     to_json() → JSON     JsonLinesReader  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴───────────┬─────────────────────┐
//! │    Schema    │          Coerce           │        Codec        │
//! ├──────────────┼───────────────────────────┼─────────────────────┤
//! │ Inference    │ widen()                   │ Encoder             │
//! │ Naming       │ accepts()                 │ Decoder             │
//! │ Documents    │ coerce()                  │ Container files     │
//! │              │                           │ Reader resolution   │
//! └──────────────┴───────────────────────────┴─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Interchange values and the JSON adapter
pub mod value;

/// Schema model, inference and Avro schema documents
pub mod schema;

/// Coercion table shared by inference and the codec
pub mod coerce;

/// Avro binary encoding and decoding
pub mod codec;

/// Job configuration
pub mod config;

/// JSON Lines to container file pipelines
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use codec::{
    decode, decode_container, decode_with_writer, encode, ContainerReader, ContainerWriter,
    Decoder, Encoder,
};
pub use config::{
    load_config, load_config_from_str, DecoderOptions, EncoderOptions, InferenceOptions,
    JobConfig,
};
pub use schema::{infer_schema, RecordField, RecordSchema, Schema, SchemaInferrer};
pub use value::{from_json, parse_json, to_json, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
