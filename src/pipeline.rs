//! Conversion pipelines
//!
//! Thin orchestration over the inference engine and the codec: JSON Lines
//! in, container files out, and back. Every entry point takes the job
//! configuration explicitly.

use crate::codec::{decode_container, ContainerStats, ContainerWriter};
use crate::config::{ErrorPolicy, InferenceOptions, JobConfig};
use crate::error::{Error, Result};
use crate::schema::{Schema, SchemaInferrer};
use crate::value::{write_json_line, JsonLinesReader, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Result of an encoding job
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    /// Schema the records were written with
    pub schema: Schema,
    /// Records written
    pub records: usize,
    /// Container blocks written
    pub blocks: usize,
    /// Total bytes written
    pub bytes: u64,
}

impl EncodeOutcome {
    fn new(schema: Schema, stats: ContainerStats) -> Self {
        Self {
            schema,
            records: stats.records,
            blocks: stats.blocks,
            bytes: stats.bytes,
        }
    }
}

/// Result of a decoding job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Records written as JSON
    pub records: usize,
    /// Records dropped under [`ErrorPolicy::Skip`]
    pub skipped: usize,
}

/// Infer a schema from JSON Lines
///
/// Stops at the first line that is not valid JSON or not an object.
pub fn infer_json_lines<R: BufRead>(reader: R, options: &InferenceOptions) -> Result<Schema> {
    let mut inferrer = SchemaInferrer::new(options.clone());
    for value in JsonLinesReader::new(reader) {
        inferrer.observe(&value?)?;
    }
    info!(records = inferrer.records_observed(), "Inferred schema");
    Ok(inferrer.finish())
}

/// Encode JSON Lines into a container file with a known schema
pub fn encode_json_lines<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    schema: Schema,
    config: &JobConfig,
) -> Result<EncodeOutcome> {
    let mut container = ContainerWriter::new(
        writer,
        schema.clone(),
        config.encoder.clone(),
        &config.container,
    )?;
    for value in JsonLinesReader::new(reader) {
        container.append(&value?)?;
    }
    let (_, stats) = container.finish()?;
    info!(
        records = stats.records,
        blocks = stats.blocks,
        bytes = stats.bytes,
        "Encoded container file"
    );
    Ok(EncodeOutcome::new(schema, stats))
}

/// Infer a schema from JSON Lines and encode them with it
///
/// The input is read once and held in memory; the schema is only known
/// after the last record. See [`infer_then_encode_file`] for inputs that
/// can be read twice instead.
pub fn infer_then_encode<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    config: &JobConfig,
) -> Result<EncodeOutcome> {
    let values: Vec<Value> = JsonLinesReader::new(reader).collect::<Result<_>>()?;
    let mut inferrer = SchemaInferrer::new(config.inference.clone());
    inferrer.observe_all(&values)?;
    let schema = inferrer.finish();

    let mut container = ContainerWriter::new(
        writer,
        schema.clone(),
        config.encoder.clone(),
        &config.container,
    )?;
    container.append_all(&values)?;
    let (_, stats) = container.finish()?;
    info!(
        records = stats.records,
        blocks = stats.blocks,
        "Inferred and encoded container file"
    );
    Ok(EncodeOutcome::new(schema, stats))
}

/// Infer then encode between files, streaming the input twice
pub fn infer_then_encode_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &JobConfig,
) -> Result<EncodeOutcome> {
    let input = input.as_ref();
    let schema = infer_json_lines(open(input)?, &config.inference)?;
    let out = BufWriter::new(File::create(output.as_ref())?);
    encode_json_lines(open(input)?, out, schema, config)
}

/// Decode a container file into JSON Lines
///
/// With a `reader_schema` records are conformed to it. Failing records
/// abort the job or are logged and skipped, per `config.decoder.on_error`.
pub fn decode_to_json_lines<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    reader_schema: Option<Schema>,
    config: &JobConfig,
) -> Result<DecodeOutcome> {
    let records = decode_container(reader, reader_schema, &config.decoder)?;
    let mut outcome = DecodeOutcome::default();

    for (index, result) in records.enumerate() {
        match result {
            Ok(value) => {
                write_json_line(&mut writer, &value)?;
                outcome.records += 1;
            }
            Err(e) if config.decoder.on_error == ErrorPolicy::Skip && e.is_record_level() => {
                warn!(record = index + 1, error = %e, "Skipping record");
                outcome.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    writer.flush()?;

    info!(
        records = outcome.records,
        skipped = outcome.skipped,
        "Decoded container file"
    );
    Ok(outcome)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            e.into()
        }
    })
}
