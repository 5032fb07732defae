//! Schema-driven encoder
//!
//! Converts one value per call into an `apache_avro` value shaped by the
//! schema, then writes it as an Avro binary datum. Record fields follow
//! schema order, never value order, so equal inputs always produce equal
//! bytes.

use super::avro::{describe, limit_allocations, to_avro_schema};
use crate::coerce::{coerce, is_null_text, Coerced, Kind};
use crate::config::EncoderOptions;
use crate::error::{Error, Result};
use crate::schema::{RecordSchema, Schema};
use crate::types::FieldPath;
use crate::value::Value;
use apache_avro::types::Value as AvroValue;
use bytes::{Bytes, BytesMut};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// Encoder bound to one schema
///
/// Cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Encoder {
    schema: Arc<Schema>,
    avro: Arc<apache_avro::Schema>,
    named: Arc<HashMap<String, Schema>>,
    options: EncoderOptions,
}

impl Encoder {
    /// Create an encoder with default options
    pub fn new(schema: Schema) -> Result<Self> {
        Self::with_options(schema, EncoderOptions::default())
    }

    /// Create an encoder with options
    ///
    /// Fails when the schema is not a valid Avro schema.
    pub fn with_options(schema: Schema, options: EncoderOptions) -> Result<Self> {
        limit_allocations();
        let avro = to_avro_schema(&schema)?;
        let named = schema.named_types();
        Ok(Self {
            schema: Arc::new(schema),
            avro: Arc::new(avro),
            named: Arc::new(named),
            options,
        })
    }

    /// The schema values are encoded with
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The same schema in `apache_avro` form
    pub fn avro_schema(&self) -> &apache_avro::Schema {
        &self.avro
    }

    /// Encode one value into a new buffer
    pub fn encode(&self, value: &Value) -> Result<Bytes> {
        let avro = self.to_avro_value(value)?;
        self.datum(avro).map(Bytes::from)
    }

    /// Append one encoded value to `buf`
    ///
    /// On error `buf` is left as it was before the call.
    pub fn encode_into(&self, value: &Value, buf: &mut BytesMut) -> Result<()> {
        let avro = self.to_avro_value(value)?;
        buf.extend_from_slice(&self.datum(avro)?);
        Ok(())
    }

    /// Encode every value, one buffer per value
    pub fn encode_all<I, V>(&self, values: I) -> Result<Vec<Bytes>>
    where
        I: IntoIterator<Item = V>,
        V: Borrow<Value>,
    {
        values
            .into_iter()
            .map(|value| self.encode(value.borrow()))
            .collect()
    }

    /// Write every value to `out` as a raw datum stream
    ///
    /// Returns the number of values written.
    pub fn write_all<W, I, V>(&self, out: &mut W, values: I) -> Result<usize>
    where
        W: Write,
        I: IntoIterator<Item = V>,
        V: Borrow<Value>,
    {
        let mut count = 0;
        for value in values {
            out.write_all(&self.encode(value.borrow())?)?;
            count += 1;
        }
        Ok(count)
    }

    /// Convert a value to its `apache_avro` form under this schema
    ///
    /// Applies the same coercions, null handling and strictness as
    /// [`Encoder::encode`], which is this followed by the byte encoding.
    pub fn to_avro_value(&self, value: &Value) -> Result<AvroValue> {
        let mut path = FieldPath::root();
        self.convert(&self.schema, value, &mut path)
    }

    fn datum(&self, value: AvroValue) -> Result<Vec<u8>> {
        apache_avro::to_avro_datum(&self.avro, value).map_err(|e| {
            Error::encoding(&FieldPath::root(), self.schema.type_label(), describe(&e))
        })
    }

    fn convert(&self, schema: &Schema, value: &Value, path: &mut FieldPath) -> Result<AvroValue> {
        match schema {
            Schema::Ref(name) => {
                let resolved = self.named.get(name).ok_or_else(|| {
                    Error::invalid_schema(format!("at {path}: unknown record '{name}'"))
                })?;
                self.convert(resolved, value, path)
            }
            Schema::Null => {
                if value.is_null() {
                    Ok(AvroValue::Null)
                } else {
                    Err(Error::encoding(path, "null", value.describe()))
                }
            }
            Schema::Union(members) => self.convert_union(schema, members, value, path),
            Schema::Record(record) => self.convert_record(record, value, path),
            Schema::Array(items) => {
                let Value::List(elements) = value else {
                    return Err(Error::encoding(path, schema.type_label(), value.describe()));
                };
                let mut out = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    path.push_index(i);
                    let converted = self.convert(items, element, path);
                    path.pop();
                    out.push(converted?);
                }
                Ok(AvroValue::Array(out))
            }
            scalar => self.convert_scalar(scalar, value, path),
        }
    }

    fn convert_union(
        &self,
        schema: &Schema,
        members: &[Schema],
        value: &Value,
        path: &mut FieldPath,
    ) -> Result<AvroValue> {
        let null_index = schema.null_index();
        if value.is_null() || (null_index.is_some() && is_null_text(value, &self.options.coercion))
        {
            return match null_index {
                Some(index) => Ok(AvroValue::Union(index as u32, Box::new(AvroValue::Null))),
                None => Err(Error::encoding(path, schema.type_label(), "null")),
            };
        }

        let mut first_error = None;
        for (index, member) in members.iter().enumerate() {
            if *member == Schema::Null {
                continue;
            }
            match self.convert(member, value, path) {
                Ok(converted) => return Ok(AvroValue::Union(index as u32, Box::new(converted))),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error
            .unwrap_or_else(|| Error::encoding(path, schema.type_label(), value.describe())))
    }

    fn convert_record(
        &self,
        record: &RecordSchema,
        value: &Value,
        path: &mut FieldPath,
    ) -> Result<AvroValue> {
        let Value::Struct(fields) = value else {
            return Err(Error::encoding(
                path,
                format!("record {}", record.name),
                value.describe(),
            ));
        };

        if self.options.strict_schema {
            if let Some((key, extra)) = fields.iter().find(|(key, _)| record.field(key).is_none())
            {
                path.push_field(key.as_str());
                let err = Error::encoding(
                    path,
                    format!("no such field in record {}", record.name),
                    extra.describe(),
                );
                path.pop();
                return Err(err);
            }
        }

        let mut out = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            path.push_field(field.key());
            let found = fields.iter().find(|(key, _)| key == field.key());
            let converted = match found {
                Some((_, v)) => self.convert(&field.schema, v, path),
                None if field.schema.is_nullable() => {
                    self.convert(&field.schema, &Value::Null, path)
                }
                None => Err(Error::encoding(
                    path,
                    field.schema.type_label(),
                    "missing field",
                )),
            };
            path.pop();
            out.push((field.name.clone(), converted?));
        }
        Ok(AvroValue::Record(out))
    }

    fn convert_scalar(
        &self,
        schema: &Schema,
        value: &Value,
        path: &mut FieldPath,
    ) -> Result<AvroValue> {
        let mismatch = || Error::encoding(path, schema.type_label(), value.describe());
        let target = Kind::of_schema(schema).ok_or_else(mismatch)?;
        let coerced = coerce(value, target, &self.options.coercion).ok_or_else(mismatch)?;

        match (schema, coerced) {
            (Schema::Boolean, Coerced::Bool(b)) => Ok(AvroValue::Boolean(b)),
            (Schema::Long, Coerced::Long(i)) => Ok(AvroValue::Long(i)),
            (Schema::Double, Coerced::Double(f)) => Ok(AvroValue::Double(f)),
            (Schema::String, Coerced::Text(s)) => Ok(AvroValue::String(s.into_owned())),
            // Sub-microsecond digits are dropped
            (Schema::Timestamp, Coerced::Timestamp(ts)) => {
                Ok(AvroValue::TimestampMicros(ts.timestamp_micros()))
            }
            _ => Err(mismatch()),
        }
    }
}

/// Encode a sequence of values into one raw datum stream
pub fn encode<I, V>(schema: &Schema, values: I) -> Result<Bytes>
where
    I: IntoIterator<Item = V>,
    V: Borrow<Value>,
{
    let encoder = Encoder::new(schema.clone())?;
    let mut buf = BytesMut::new();
    for value in values {
        encoder.encode_into(value.borrow(), &mut buf)?;
    }
    Ok(buf.freeze())
}
