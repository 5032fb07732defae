//! Schema module
//!
//! The target schema type algebra, inference of a schema from interchange
//! values, and Avro JSON schema documents.
//!
//! # Features
//!
//! - **Type Inference**: Infers one schema from any number of records
//! - **Schema Merging**: Unions field sets and widens conflicting kinds to string
//! - **Nullable Detection**: Wraps fields that were ever missing or null
//! - **Array Type Inference**: Folds every element into one item type
//! - **Unique Record Names**: Derives record names from full field paths

mod document;
mod inference;
mod naming;
mod types;

pub use inference::{infer_schema, SchemaInferrer};
pub use naming::{field_names, is_valid_name, is_valid_namespace, sanitize_segment, NameRegistry};
pub use types::{RecordField, RecordSchema, Schema};

#[cfg(test)]
mod tests;
