//! Interchange value module
//!
//! The in-memory representation of one semi-structured record and the
//! JSON adapter that produces and consumes it.
//!
//! # Overview
//!
//! - **Value**: closed tagged variant over null, boolean, integer, float,
//!   exact decimal, text, timestamp, list and ordered struct
//! - **JSON adapter**: exact number classification, JSON Lines reading and writing

mod json;
mod types;

pub use json::{from_json, parse_json, to_json, to_json_string, write_json_line, JsonLinesReader};
pub use types::Value;
