//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::codec::ContainerReader;
use crate::config::{load_config, ErrorPolicy, JobConfig};
use crate::error::{Error, Result, ResultExt};
use crate::pipeline::{
    decode_to_json_lines, encode_json_lines, infer_json_lines, infer_then_encode_file,
    EncodeOutcome,
};
use crate::schema::Schema;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Infer {
                input,
                output,
                root_name,
                namespace,
            } => {
                let mut config = self.load_config()?;
                apply_naming(&mut config, root_name.as_deref(), namespace.as_deref());
                config.validate()?;
                self.infer(input, output.as_deref(), &config)
            }
            Commands::Encode {
                input,
                output,
                schema,
                strict,
                block_size,
                root_name,
                namespace,
            } => {
                let mut config = self.load_config()?;
                apply_naming(&mut config, root_name.as_deref(), namespace.as_deref());
                config.encoder.strict_schema |= *strict;
                if let Some(size) = block_size {
                    config.container.block_size = *size;
                }
                config.validate()?;
                self.encode(input, output, schema.as_deref(), &config)
            }
            Commands::Decode {
                input,
                output,
                schema,
                strict,
                skip_errors,
            } => {
                let mut config = self.load_config()?;
                config.decoder.strict_unknown_fields |= *strict;
                if *skip_errors {
                    config.decoder.on_error = ErrorPolicy::Skip;
                }
                config.validate()?;
                self.decode(input, output.as_deref(), schema.as_deref(), &config)
            }
            Commands::Schema { input } => self.schema(input),
        }
    }

    /// Load the job configuration, or the defaults without `--config`
    fn load_config(&self) -> Result<JobConfig> {
        match &self.cli.config {
            Some(path) => load_config(path),
            None => Ok(JobConfig::default()),
        }
    }

    /// Infer and print a schema
    fn infer(&self, input: &Path, output: Option<&Path>, config: &JobConfig) -> Result<()> {
        let schema = infer_json_lines(open(input)?, &config.inference)?;
        match output {
            Some(path) => {
                fs::write(path, schema.to_json_pretty())
                    .with_context(|| format!("Failed to write schema to '{}'", path.display()))?;
                self.output_message(&json!({
                    "type": "LOG",
                    "log": {
                        "level": "INFO",
                        "message": format!("Schema written to {}", path.display())
                    }
                }));
            }
            None => self.output_message(&schema.to_document()),
        }
        Ok(())
    }

    /// Encode JSON Lines into a container file
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        schema: Option<&Path>,
        config: &JobConfig,
    ) -> Result<()> {
        let start = Instant::now();
        let outcome = match schema {
            Some(schema_path) => {
                let schema = read_schema(schema_path)?;
                let out = BufWriter::new(File::create(output)?);
                encode_json_lines(open(input)?, out, schema, config)?
            }
            None => infer_then_encode_file(input, output, config)?,
        };
        self.output_stats(&outcome, start);
        Ok(())
    }

    /// Decode a container file into JSON Lines
    fn decode(
        &self,
        input: &Path,
        output: Option<&Path>,
        schema: Option<&Path>,
        config: &JobConfig,
    ) -> Result<()> {
        let reader_schema = schema.map(read_schema).transpose()?;
        let start = Instant::now();

        match output {
            Some(path) => {
                let out = BufWriter::new(File::create(path)?);
                let outcome = decode_to_json_lines(open(input)?, out, reader_schema, config)?;
                self.output_message(&json!({
                    "type": "STATS",
                    "stats": {
                        "records": outcome.records,
                        "skipped": outcome.skipped,
                        "elapsed_ms": start.elapsed().as_millis() as u64
                    }
                }));
            }
            None => {
                let stdout = io::stdout();
                decode_to_json_lines(open(input)?, stdout.lock(), reader_schema, config)?;
            }
        }
        Ok(())
    }

    /// Print the writer schema of a container file
    fn schema(&self, input: &Path) -> Result<()> {
        let reader = ContainerReader::new(open(input)?)?;
        self.output_message(&reader.writer_schema().to_document());
        Ok(())
    }

    fn output_stats(&self, outcome: &EncodeOutcome, start: Instant) {
        self.output_message(&json!({
            "type": "STATS",
            "stats": {
                "records": outcome.records,
                "blocks": outcome.blocks,
                "bytes": outcome.bytes,
                "elapsed_ms": start.elapsed().as_millis() as u64
            }
        }));
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", rendered.unwrap_or_default());
    }
}

fn apply_naming(config: &mut JobConfig, root_name: Option<&str>, namespace: Option<&str>) {
    if let Some(name) = root_name {
        config.inference.root_name = name.to_string();
    }
    if let Some(ns) = namespace {
        config.inference.namespace = Some(ns.to_string());
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(BufReader::new(File::open(path)?))
}

fn read_schema(path: &Path) -> Result<Schema> {
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            e.into()
        }
    })?;
    Schema::parse(&text)
}
