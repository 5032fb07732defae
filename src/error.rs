//! Error types for avro-infer
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::types::FieldPath;
use thiserror::Error;

/// The main error type for avro-infer
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Interchange Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse JSON at line {line}: {message}")]
    JsonLine { line: usize, message: String },

    // ============================================================================
    // Schema Errors
    // ============================================================================
    #[error("Schema inference failed: {message}")]
    Inference { message: String },

    #[error("Invalid schema document: {message}")]
    InvalidSchema { message: String },

    #[error("Schema mismatch at {path}: {message}")]
    SchemaMismatch { path: FieldPath, message: String },

    // ============================================================================
    // Codec Errors
    // ============================================================================
    #[error("Encoding failed at {path}: expected {expected}, got {actual}")]
    Encoding {
        path: FieldPath,
        expected: String,
        actual: String,
    },

    #[error("Decoding failed at byte {offset} ({path}): expected {expected}: {detail}")]
    Decoding {
        offset: u64,
        path: FieldPath,
        expected: String,
        detail: String,
    },

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an inference error
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    /// Create an invalid schema document error
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Create a schema mismatch error
    pub fn mismatch(path: &FieldPath, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(
        path: &FieldPath,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Encoding {
            path: path.clone(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(
        offset: u64,
        path: &FieldPath,
        expected: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Decoding {
            offset,
            path: path.clone(),
            expected: expected.into(),
            detail: detail.into(),
        }
    }

    /// Structural path the error occurred at, if it has one
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            Error::SchemaMismatch { path, .. }
            | Error::Encoding { path, .. }
            | Error::Decoding { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Check if this error only affects a single record
    ///
    /// Callers that collect errors and continue may skip such records;
    /// everything else should abort the job.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Error::Encoding { .. }
                | Error::Decoding { .. }
                | Error::SchemaMismatch { .. }
                | Error::JsonLine { .. }
        )
    }
}

/// Result type alias for avro-infer
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
