//! Avro object container files
//!
//! Framing (magic, metadata, sync markers, blocks) is written and read by
//! `apache_avro`. Only the `null` codec is written.

use super::avro::{describe, from_avro_schema, limit_allocations, sync_marker, Tally};
use super::decoder::Decoder;
use super::encoder::Encoder;
use super::resolve::Resolver;
use crate::config::{ContainerOptions, DecoderOptions, EncoderOptions};
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::FieldPath;
use crate::value::Value;
use apache_avro::types::Value as AvroValue;
use apache_avro::{Reader, Writer};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// File magic
pub const MAGIC: &[u8; 4] = b"Obj\x01";

// ============================================================================
// Writer
// ============================================================================

/// Totals for a finished container file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub records: usize,
    pub blocks: usize,
    pub bytes: u64,
}

/// Writes values into an object container file
///
/// Values are converted as they are appended and written a block at a
/// time, every `block_size` records. `apache_avro` may also close a block
/// early once its buffer passes 16000 bytes.
pub struct ContainerWriter<W: Write> {
    out: Tally<W>,
    encoder: Encoder,
    marker: [u8; 16],
    pending: Vec<AvroValue>,
    block_size: usize,
    empty_records: bool,
    stats: ContainerStats,
}

impl<W: Write> ContainerWriter<W> {
    /// Create a writer and emit the file header
    pub fn new(
        out: W,
        schema: Schema,
        encoder_options: EncoderOptions,
        container_options: &ContainerOptions,
    ) -> Result<Self> {
        let empty_records = encodes_empty(&schema);
        let encoder = Encoder::with_options(schema, encoder_options)?;
        let marker = sync_marker(encoder.avro_schema());

        let mut out = Tally::new(out);
        Writer::builder()
            .schema(encoder.avro_schema())
            .writer(&mut out)
            .marker(marker)
            .build()
            .into_inner()?;

        let stats = ContainerStats {
            bytes: out.count(),
            ..ContainerStats::default()
        };
        Ok(Self {
            out,
            encoder,
            marker,
            pending: Vec::new(),
            block_size: container_options.block_size.max(1),
            empty_records,
            stats,
        })
    }

    /// The schema records are written with
    pub fn schema(&self) -> &Schema {
        self.encoder.schema()
    }

    /// Append one value
    ///
    /// A value that fails to encode leaves the file unchanged. Schemas whose
    /// records encode to zero bytes take no records: readers could not tell
    /// them apart.
    pub fn append(&mut self, value: &Value) -> Result<()> {
        if self.empty_records {
            return Err(Error::invalid_schema(format!(
                "records of {} encode to zero bytes and cannot be framed in a container file",
                self.encoder.schema()
            )));
        }
        let converted = self.encoder.to_avro_value(value)?;
        self.pending.push(converted);
        self.stats.records += 1;
        if self.pending.len() >= self.block_size {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Append every value, stopping at the first failure
    pub fn append_all<'a, I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for value in values {
            self.append(value)?;
        }
        Ok(())
    }

    /// Write the pending records, if any
    pub fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut writer = Writer::append_to(self.encoder.avro_schema(), &mut self.out, self.marker);
        let mut blocks = 0;
        for value in &self.pending {
            // Non-zero only when the buffer filled up and a block went out
            if writer.append_value_ref(value)? > 0 {
                blocks += 1;
            }
        }
        if writer.flush()? > 0 {
            blocks += 1;
        }

        debug!(
            records = self.pending.len(),
            blocks,
            "Wrote container block"
        );
        self.pending.clear();
        self.stats.blocks += blocks;
        self.stats.bytes = self.out.count();
        Ok(())
    }

    /// Flush the last block and return the sink with totals
    pub fn finish(mut self) -> Result<(W, ContainerStats)> {
        self.flush_block()?;
        self.out.flush()?;
        self.stats.bytes = self.out.count();
        Ok((self.out.into_inner(), self.stats))
    }
}

/// Check if every record of `schema` encodes to zero bytes
fn encodes_empty(schema: &Schema) -> bool {
    fn walk(schema: &Schema, named: &HashMap<String, Schema>, seen: &mut HashSet<String>) -> bool {
        match schema {
            Schema::Null => true,
            Schema::Record(record) => {
                seen.insert(record.name.clone());
                record.fields.iter().all(|f| walk(&f.schema, named, seen))
            }
            Schema::Ref(name) => match named.get(name) {
                Some(resolved) if seen.insert(name.clone()) => walk(resolved, named, seen),
                _ => false,
            },
            _ => false,
        }
    }
    walk(schema, &schema.named_types(), &mut HashSet::new())
}

// ============================================================================
// Reader
// ============================================================================

/// Reads values from an object container file
///
/// Iteration yields one `Result` per record. A record that does not match
/// the reader schema is reported and reading goes on. Damaged data (bad
/// bytes, a wrong sync marker, a truncated block) ends iteration after the
/// error. Offsets in errors are the input position reached when the fault
/// surfaced; blocks are read whole, so that is the end of the block.
pub struct ContainerReader<R> {
    reader: Reader<'static, Tally<R>>,
    offset: Arc<AtomicU64>,
    decoder: Decoder,
    resolver: Option<Resolver>,
    options: DecoderOptions,
    done: bool,
}

impl<R: Read> ContainerReader<R> {
    /// Open a container file with default decoder options
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, DecoderOptions::default())
    }

    /// Open a container file and read its header
    pub fn with_options(reader: R, options: DecoderOptions) -> Result<Self> {
        limit_allocations();
        let input = Tally::new(reader);
        let offset = input.counter();
        let reader = Reader::new(input).map_err(|e| {
            Error::decoding(
                offset.load(Ordering::Relaxed),
                &FieldPath::root(),
                "container header",
                describe(&e),
            )
        })?;

        let schema = from_avro_schema(reader.writer_schema())?;
        debug!(schema = %schema, "Opened container file");

        Ok(Self {
            reader,
            offset,
            decoder: Decoder::new(schema)?,
            resolver: None,
            options,
            done: false,
        })
    }

    /// Conform records to a reader schema
    ///
    /// Honours the `strict_unknown_fields` option the reader was opened with.
    #[must_use]
    pub fn with_reader_schema(mut self, schema: Schema) -> Self {
        self.resolver = Some(Resolver::new(schema, &self.options));
        self
    }

    /// The schema the file was written with
    pub fn writer_schema(&self) -> &Schema {
        self.decoder.schema()
    }

    /// The schema records are returned in
    pub fn reader_schema(&self) -> &Schema {
        self.resolver
            .as_ref()
            .map_or_else(|| self.decoder.schema(), Resolver::schema)
    }

    /// Header metadata outside the reserved `avro.` keys
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        self.reader.user_metadata()
    }

    /// Input bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::Relaxed)
    }
}

impl<R: Read> Iterator for ContainerReader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let decoded = match self.reader.next() {
            None => {
                self.done = true;
                return None;
            }
            Some(Err(e)) => {
                self.done = true;
                return Some(Err(Error::decoding(
                    self.offset(),
                    &FieldPath::root(),
                    "container block",
                    describe(&e),
                )));
            }
            Some(Ok(value)) => self.decoder.rebuild(value, self.offset()),
        };

        Some(match (&self.resolver, decoded) {
            (Some(resolver), Ok(value)) => resolver.conform(value),
            (_, other) => other,
        })
    }
}

impl<R: Read> std::iter::FusedIterator for ContainerReader<R> {}

/// Decode every record of a container file
///
/// With a `reader_schema` records are conformed to it, strictly or best
/// effort per `options`.
pub fn decode_container<R: Read>(
    reader: R,
    reader_schema: Option<Schema>,
    options: &DecoderOptions,
) -> Result<ContainerReader<R>> {
    let container = ContainerReader::with_options(reader, options.clone())?;
    Ok(match reader_schema {
        Some(schema) => container.with_reader_schema(schema),
        None => container,
    })
}
