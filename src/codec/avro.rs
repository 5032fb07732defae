//! Bridge to the `apache_avro` crate
//!
//! Byte-level work (datums, container framing) is done by `apache_avro`.
//! This module converts schemas both ways, rebuilds interchange values from
//! decoded Avro values and counts the bytes flowing through its readers and
//! writers so errors can carry offsets.

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::FieldPath;
use crate::value::Value;
use apache_avro::rabin::Rabin;
use apache_avro::schema::SchemaKind;
use apache_avro::types::Value as AvroValue;
use chrono::DateTime;
use std::collections::HashMap;
use std::io::{self, BufRead, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest single allocation a decoded length or block count may ask for
///
/// Applied process-wide by the first encoder, decoder or container reader.
/// Arrays of zero-width items (`array<null>`) cost no input bytes per item,
/// so this also bounds how many of them one block may claim.
pub const MAX_ALLOCATION_BYTES: usize = 8 * 1024 * 1024;

pub(crate) fn limit_allocations() {
    apache_avro::max_allocation_bytes(MAX_ALLOCATION_BYTES);
}

// ============================================================================
// Schemas
// ============================================================================

/// Parse a schema into its `apache_avro` form
pub fn to_avro_schema(schema: &Schema) -> Result<apache_avro::Schema> {
    apache_avro::Schema::parse(&schema.to_document())
        .map_err(|e| Error::invalid_schema(format!("not a valid Avro schema: {e}")))
}

/// Read an `apache_avro` schema back into the crate's schema model
pub fn from_avro_schema(schema: &apache_avro::Schema) -> Result<Schema> {
    let doc = serde_json::to_value(schema)
        .map_err(|e| Error::invalid_schema(format!("cannot render Avro schema: {e}")))?;
    Schema::from_document(&doc)
}

/// Sync marker derived from the schema fingerprint
///
/// Eight fingerprint bytes followed by their complement.
pub(crate) fn sync_marker(schema: &apache_avro::Schema) -> [u8; 16] {
    let fingerprint = schema.fingerprint::<Rabin>();
    let mut marker = [0u8; 16];
    for (i, byte) in fingerprint.bytes.iter().take(8).enumerate() {
        marker[i] = *byte;
        marker[i + 8] = !*byte;
    }
    marker
}

/// Error text with its source chain
pub(crate) fn describe(err: &apache_avro::Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

// ============================================================================
// Values
// ============================================================================

/// Rebuilds interchange values from values decoded by `apache_avro`
///
/// `apache_avro` decodes a string cut short by the end of input as null, so
/// every position is checked against the schema here rather than trusted.
pub(crate) struct Rebuild<'a> {
    pub named: &'a HashMap<String, Schema>,
    /// Offset reported in errors
    pub offset: u64,
}

impl Rebuild<'_> {
    pub fn value(&self, schema: &Schema, value: AvroValue) -> Result<Value> {
        let mut path = FieldPath::root();
        self.at(schema, value, &mut path)
    }

    fn at(&self, schema: &Schema, value: AvroValue, path: &mut FieldPath) -> Result<Value> {
        match (schema, value) {
            (Schema::Ref(name), value) => {
                let resolved = self.named.get(name).ok_or_else(|| {
                    Error::invalid_schema(format!("at {path}: unknown record '{name}'"))
                })?;
                self.at(resolved, value, path)
            }
            (Schema::Union(_), AvroValue::Union(_, inner)) => match *inner {
                AvroValue::Null if schema.is_nullable() => Ok(Value::Null),
                inner => {
                    let member = schema.non_null();
                    if std::ptr::eq(member, schema) {
                        return Err(self.fault(schema, &inner, path));
                    }
                    self.at(member, inner, path)
                }
            },
            // A one-branch union in the document is read as that branch
            (_, AvroValue::Union(_, inner)) => self.at(schema, *inner, path),
            (Schema::Null, AvroValue::Null) => Ok(Value::Null),
            (Schema::Boolean, AvroValue::Boolean(b)) => Ok(Value::Bool(b)),
            (Schema::Long, AvroValue::Long(i)) => Ok(Value::Int(i)),
            (Schema::Long, AvroValue::Int(i)) => Ok(Value::Int(i64::from(i))),
            (Schema::Double, AvroValue::Double(f)) => Ok(Value::Float(f)),
            (Schema::Double, AvroValue::Float(f)) => Ok(Value::Float(f64::from(f))),
            (Schema::String, AvroValue::String(s)) => Ok(Value::Text(s)),
            (Schema::String, AvroValue::Null) => Err(Error::decoding(
                self.offset,
                path,
                schema.type_label(),
                "unexpected end of input",
            )),
            (Schema::Timestamp, AvroValue::TimestampMicros(micros) | AvroValue::Long(micros)) => {
                DateTime::from_timestamp_micros(micros)
                    .map(Value::Timestamp)
                    .ok_or_else(|| {
                        Error::decoding(
                            self.offset,
                            path,
                            schema.type_label(),
                            format!("{micros} is out of the timestamp range"),
                        )
                    })
            }
            (Schema::Record(record), AvroValue::Record(fields)) => {
                if fields.len() != record.fields.len() {
                    return Err(Error::decoding(
                        self.offset,
                        path,
                        schema.type_label(),
                        format!("decoded {} fields", fields.len()),
                    ));
                }
                let mut out = Vec::with_capacity(fields.len());
                for (field, (_, value)) in record.fields.iter().zip(fields) {
                    path.push_field(field.key());
                    let rebuilt = self.at(&field.schema, value, path);
                    path.pop();
                    out.push((field.key().to_string(), rebuilt?));
                }
                Ok(Value::Struct(out))
            }
            (Schema::Array(items), AvroValue::Array(elements)) => {
                let mut out = Vec::with_capacity(elements.len());
                for (i, element) in elements.into_iter().enumerate() {
                    path.push_index(i);
                    let rebuilt = self.at(items, element, path);
                    path.pop();
                    out.push(rebuilt?);
                }
                Ok(Value::List(out))
            }
            (schema, value) => Err(self.fault(schema, &value, path)),
        }
    }

    fn fault(&self, schema: &Schema, value: &AvroValue, path: &FieldPath) -> Error {
        Error::decoding(
            self.offset,
            path,
            schema.type_label(),
            format!("decoded {:?} value", SchemaKind::from(value)),
        )
    }
}

// ============================================================================
// Byte counting
// ============================================================================

/// Reader or writer wrapper counting the bytes that pass through it
///
/// The count is shared, so it stays readable after the wrapper has been
/// handed to an `apache_avro` reader or writer.
#[derive(Debug)]
pub(crate) struct Tally<T> {
    inner: T,
    count: Arc<AtomicU64>,
}

impl<T> Tally<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle on the running count
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.count)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<R: Read> Read for Tally<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for Tally<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.count.fetch_add(amt as u64, Ordering::Relaxed);
    }
}

impl<W: Write> Write for Tally<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
