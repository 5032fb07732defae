//! JSON adapter for the interchange model
//!
//! Numbers are classified from their exact source text (the crate enables
//! `serde_json`'s `arbitrary_precision`), so `3.14` stays an exact decimal and
//! only exponent-form literals become floats.

use super::types::Value;
use crate::error::{Error, Result};
use chrono::SecondsFormat;
use serde_json::{Map, Number};
use std::io::{BufRead, Lines, Write};

// ============================================================================
// JSON -> Value
// ============================================================================

/// Convert a parsed JSON tree into a [`Value`]
pub fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => classify_number(&n),
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::Struct(map.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

/// Parse JSON text into a [`Value`]
pub fn parse_json(text: &str) -> Result<Value> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(from_json(value))
}

fn classify_number(n: &Number) -> Value {
    let text = n.to_string();
    if text.contains(['e', 'E']) {
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::ExactDecimal(text),
        }
    } else if text.contains('.') {
        Value::ExactDecimal(text)
    } else {
        // Integers outside i64 keep their digits
        text.parse::<i64>()
            .map_or(Value::ExactDecimal(text), Value::Int)
    }
}

// ============================================================================
// Value -> JSON
// ============================================================================

/// Convert a [`Value`] into a JSON tree
///
/// Floats are written in exponent form so they parse back as floats,
/// timestamps as RFC 3339 strings. Non-finite floats become `null`.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => float_to_json(*f),
        Value::ExactDecimal(digits) => serde_json::from_str::<Number>(digits)
            .map_or_else(|_| serde_json::Value::String(digits.clone()), serde_json::Value::Number),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Timestamp(ts) => {
            serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Struct(fields) => {
            let map: Map<String, serde_json::Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    if !f.is_finite() {
        return serde_json::Value::Null;
    }
    serde_json::from_str::<Number>(&format!("{f:e}"))
        .map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Render a [`Value`] as compact JSON text
pub fn to_json_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(&to_json(value))?)
}

/// Write a [`Value`] as one JSON Lines record
pub fn write_json_line<W: Write>(out: &mut W, value: &Value) -> Result<()> {
    serde_json::to_writer(&mut *out, &to_json(value))?;
    out.write_all(b"\n")?;
    Ok(())
}

// ============================================================================
// JSON Lines Reader
// ============================================================================

/// Lazy JSON Lines reader (one JSON document per line)
///
/// Blank lines are skipped. A line that fails to parse yields an error for
/// that line only; the reader keeps going on the next call.
pub struct JsonLinesReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> JsonLinesReader<R> {
    /// Create a new JSON Lines reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<serde_json::Value>(line)
                .map(from_json)
                .map_err(|e| Error::JsonLine {
                    line: self.line,
                    message: e.to_string(),
                });
            return Some(parsed);
        }
    }
}
