//! CLI module
//!
//! Command-line interface for schema inference and Avro conversion.
//!
//! # Commands
//!
//! - `infer` - Infer an Avro schema from JSON Lines
//! - `encode` - Write JSON Lines into an Avro container file
//! - `decode` - Read an Avro container file back into JSON Lines
//! - `schema` - Print the writer schema of a container file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
