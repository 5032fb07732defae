//! Job configuration
//!
//! One [`JobConfig`] value is built per conversion job (from YAML, from CLI
//! flags, or both) and passed explicitly to every stage. Nothing is global.

use crate::error::{Error, Result};
use crate::schema::{is_valid_name, is_valid_namespace};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// Top-Level Job Config
// ============================================================================

/// Complete job configuration loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Schema inference settings
    pub inference: InferenceOptions,

    /// Encoder settings
    pub encoder: EncoderOptions,

    /// Decoder settings
    pub decoder: DecoderOptions,

    /// Container file settings
    pub container: ContainerOptions,
}

// ============================================================================
// Inference
// ============================================================================

/// Schema inference settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    /// Name of the top-level record
    pub root_name: String,

    /// Namespace prefixed to every generated record name
    pub namespace: Option<String>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            root_name: default_root_name(),
            namespace: None,
        }
    }
}

fn default_root_name() -> String {
    "root".to_string()
}

// ============================================================================
// Encoder
// ============================================================================

/// Encoder settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// Reject struct fields the record schema does not declare
    pub strict_schema: bool,

    /// Text coercion rules
    #[serde(flatten)]
    pub coercion: CoercionOptions,
}

/// Text coercion rules shared by the encoder and decoder resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionOptions {
    /// Text accepted as `true` for boolean positions (case-insensitive)
    ///
    /// Digits are not in the defaults; add `"1"` and `"0"` to read them as booleans.
    pub true_values: Vec<String>,

    /// Text accepted as `false` for boolean positions (case-insensitive)
    pub false_values: Vec<String>,

    /// Text written as null in nullable positions (exact match)
    pub null_values: Vec<String>,
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            true_values: default_true_values(),
            false_values: default_false_values(),
            null_values: Vec::new(),
        }
    }
}

fn default_true_values() -> Vec<String> {
    ["t", "true", "enabled", "on", "yes"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_false_values() -> Vec<String> {
    ["f", "false", "disabled", "off", "no"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

// ============================================================================
// Decoder
// ============================================================================

/// What to do with a record that fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop at the first failing record
    #[default]
    Abort,
    /// Log the failure and continue with the next record
    Skip,
}

/// Decoder settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Reject payload fields and types the reader schema does not know
    pub strict_unknown_fields: bool,

    /// Failure handling in pipelines
    pub on_error: ErrorPolicy,

    /// Text coercion rules for best-effort resolution
    #[serde(flatten)]
    pub coercion: CoercionOptions,
}

// ============================================================================
// Container
// ============================================================================

/// Container file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Records per block
    pub block_size: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

fn default_block_size() -> usize {
    1000
}

// ============================================================================
// Loading
// ============================================================================

/// Load a job configuration from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<JobConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_config_from_str(&content)
}

/// Load a job configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<JobConfig> {
    if yaml.trim().is_empty() {
        return Ok(JobConfig::default());
    }
    let config: JobConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse job config YAML: {e}")))?;

    config.validate()?;
    Ok(config)
}

impl JobConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.inference.root_name) {
            return Err(Error::invalid_value(
                "inference.root_name",
                format!(
                    "'{}' is not a valid record name",
                    self.inference.root_name
                ),
            ));
        }

        if let Some(namespace) = &self.inference.namespace {
            if !is_valid_namespace(namespace) {
                return Err(Error::invalid_value(
                    "inference.namespace",
                    format!("'{namespace}' is not a valid namespace"),
                ));
            }
        }

        if self.container.block_size == 0 {
            return Err(Error::invalid_value(
                "container.block_size",
                "must be greater than zero",
            ));
        }

        validate_coercion("encoder", &self.encoder.coercion)?;
        validate_coercion("decoder", &self.decoder.coercion)?;
        Ok(())
    }
}

fn validate_coercion(section: &str, coercion: &CoercionOptions) -> Result<()> {
    for value in &coercion.true_values {
        if coercion
            .false_values
            .iter()
            .any(|f| f.eq_ignore_ascii_case(value))
        {
            return Err(Error::invalid_value(
                format!("{section}.true_values"),
                format!("'{value}' is listed as both true and false"),
            ));
        }
    }
    Ok(())
}
