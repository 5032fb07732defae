//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Infer Avro schemas from JSON Lines and convert between the two
#[derive(Parser, Debug)]
#[command(name = "avro-infer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for schemas and summaries
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Infer an Avro schema from JSON Lines
    Infer {
        /// JSON Lines input file
        input: PathBuf,

        /// Write the schema here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Name of the top-level record
        #[arg(long)]
        root_name: Option<String>,

        /// Namespace for generated record names
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Encode JSON Lines into an Avro container file
    Encode {
        /// JSON Lines input file
        input: PathBuf,

        /// Container file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Avro schema file (JSON); inferred from the input when omitted
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Reject fields the schema does not declare
        #[arg(long)]
        strict: bool,

        /// Records per container block
        #[arg(long)]
        block_size: Option<usize>,

        /// Name of the top-level record (inferred schemas only)
        #[arg(long)]
        root_name: Option<String>,

        /// Namespace for generated record names (inferred schemas only)
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Decode an Avro container file into JSON Lines
    Decode {
        /// Container file to read
        input: PathBuf,

        /// Write JSON Lines here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reader schema file (JSON); the writer schema when omitted
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Reject payloads that disagree with the reader schema
        #[arg(long)]
        strict: bool,

        /// Log and skip records that fail to decode
        #[arg(long)]
        skip_errors: bool,
    },

    /// Print the writer schema of a container file
    Schema {
        /// Container file to read
        input: PathBuf,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON (one message per line)
    Json,
    /// Indented JSON
    Pretty,
}
