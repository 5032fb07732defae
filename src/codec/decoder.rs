//! Schema-driven decoder

use super::avro::{describe, limit_allocations, to_avro_schema, Rebuild, Tally};
use super::resolve::Resolver;
use crate::config::DecoderOptions;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::FieldPath;
use crate::value::Value;
use apache_avro::types::Value as AvroValue;
use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::sync::Arc;

/// Decoder bound to the schema the data was written with
#[derive(Debug, Clone)]
pub struct Decoder {
    schema: Arc<Schema>,
    avro: Arc<apache_avro::Schema>,
    named: Arc<HashMap<String, Schema>>,
}

impl Decoder {
    /// Create a decoder for data written with `schema`
    pub fn new(schema: Schema) -> Result<Self> {
        limit_allocations();
        let avro = to_avro_schema(&schema)?;
        let named = schema.named_types();
        Ok(Self {
            schema: Arc::new(schema),
            avro: Arc::new(avro),
            named: Arc::new(named),
        })
    }

    /// The writer schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decode one datum from the reader
    ///
    /// `offset` is the datum's position in the input; errors report it.
    pub fn decode_datum<R: Read>(&self, reader: &mut R, offset: u64) -> Result<Value> {
        let value = apache_avro::from_avro_datum(&self.avro, reader, None).map_err(|e| {
            Error::decoding(offset, &FieldPath::root(), self.schema.type_label(), describe(&e))
        })?;
        self.rebuild(value, offset)
    }

    /// Decode exactly one datum from a byte slice
    pub fn decode_slice(&self, bytes: &[u8]) -> Result<Value> {
        let mut rest = bytes;
        let value = self.decode_datum(&mut rest, 0)?;
        if !rest.is_empty() {
            let consumed = (bytes.len() - rest.len()) as u64;
            return Err(Error::decoding(
                consumed,
                &FieldPath::root(),
                "end of datum",
                format!("{} trailing bytes", rest.len()),
            ));
        }
        Ok(value)
    }

    /// Iterate over a stream of concatenated datums
    pub fn stream<R: BufRead>(self, reader: R) -> DatumIter<R> {
        DatumIter {
            decoder: self,
            resolver: None,
            reader: Tally::new(reader),
            done: false,
        }
    }

    pub(crate) fn rebuild(&self, value: AvroValue, offset: u64) -> Result<Value> {
        Rebuild {
            named: &self.named,
            offset,
        }
        .value(&self.schema, value)
    }
}

/// Lazy iterator over a raw datum stream
///
/// Ends at a clean end of input. After the first decoding error it yields
/// nothing more: a raw stream has no boundary to resynchronise on. Schema
/// mismatches leave the stream aligned and iteration continues.
pub struct DatumIter<R> {
    decoder: Decoder,
    resolver: Option<Resolver>,
    reader: Tally<R>,
    done: bool,
}

impl<R: BufRead> DatumIter<R> {
    /// Conform every decoded value to a reader schema
    #[must_use]
    pub fn with_reader_schema(mut self, schema: Schema, options: &DecoderOptions) -> Self {
        self.resolver = Some(Resolver::new(schema, options));
        self
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.reader.count()
    }
}

impl<R: BufRead> Iterator for DatumIter<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.fill_buf() {
            Ok([]) => {
                self.done = true;
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }

        let offset = self.reader.count();
        let decoded = self.decoder.decode_datum(&mut self.reader, offset);
        let result = match (&self.resolver, decoded) {
            (Some(resolver), Ok(value)) => resolver.conform(value),
            (_, other) => other,
        };
        if matches!(&result, Err(e) if !matches!(e, Error::SchemaMismatch { .. })) {
            self.done = true;
        }
        Some(result)
    }
}

impl<R: BufRead> std::iter::FusedIterator for DatumIter<R> {}

/// Decode a raw datum stream written with `schema`
///
/// A raw stream carries no writer schema, so `schema` is both the writer
/// and the reader schema. Unknown-field checks need the two apart: with
/// `strict_unknown_fields` set this fails with a schema mismatch, and
/// [`decode_with_writer`] is the entry point to use.
pub fn decode<R: BufRead>(
    schema: &Schema,
    reader: R,
    options: &DecoderOptions,
) -> Result<DatumIter<R>> {
    if options.strict_unknown_fields {
        return Err(Error::mismatch(
            &FieldPath::root(),
            "strict unknown-field checks need the writer schema, which a raw stream \
             does not carry; use decode_with_writer",
        ));
    }
    tracing::debug!(schema = %schema, "Decoding raw datum stream");
    Ok(Decoder::new(schema.clone())?.stream(reader))
}

/// Decode a raw datum stream written with `writer` into `reader_schema`
///
/// Every datum is decoded with the writer schema, then conformed to the
/// reader schema, strictly or best effort per `options`.
pub fn decode_with_writer<R: BufRead>(
    writer: &Schema,
    reader_schema: &Schema,
    reader: R,
    options: &DecoderOptions,
) -> Result<DatumIter<R>> {
    tracing::debug!(
        strict = options.strict_unknown_fields,
        writer = %writer,
        reader = %reader_schema,
        "Decoding raw datum stream with a reader schema"
    );
    Ok(Decoder::new(writer.clone())?
        .stream(reader)
        .with_reader_schema(reader_schema.clone(), options))
}
