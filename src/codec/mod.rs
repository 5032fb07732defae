//! Avro binary codec module
//!
//! Encodes interchange values against a [`Schema`](crate::schema::Schema) and
//! decodes them back, as raw datum streams or object container files. The
//! bytes themselves are written and read by `apache_avro`.
//!
//! # Overview
//!
//! - **Encoder**: schema-ordered records, coercion through the shared table
//! - **Decoder**: lazy datum iterator with byte offsets in every error
//! - **Container files**: `apache_avro` writer and reader behind the crate's types
//! - **Resolution**: conforming payloads to a reader schema, strict or best effort

mod avro;
mod container;
mod decoder;
mod encoder;
mod resolve;

pub use avro::{from_avro_schema, to_avro_schema, MAX_ALLOCATION_BYTES};
pub use container::{decode_container, ContainerReader, ContainerStats, ContainerWriter, MAGIC};
pub use decoder::{decode, decode_with_writer, DatumIter, Decoder};
pub use encoder::{encode, Encoder};
pub use resolve::Resolver;
