//! Error types for configuration resolution.
//!
//! Responsibilities:
//! - Define error variants for every fatal resolution failure.
//!
//! Does NOT handle:
//! - Malformed env-file lines (skipped by the parser, never an error).
//! - Environment mismatches (an all-Missing instance, never an error).
//!
//! Invariants:
//! - All variants carry the field name and/or lookup key for debugging.
//! - Raw values of secret-typed fields are replaced with `REDACTED`.
//! - Env-file errors never include file contents.
//! - Errors are `Clone` so lazily resolved fields can cache them.

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A raw value could not be converted to the field's declared type.
    #[error("Invalid value for {field} ({key}): cannot cast {raw:?} to {expected}: {reason}")]
    Cast {
        field: String,
        key: String,
        raw: String,
        expected: String,
        reason: String,
    },

    /// A required field has no value in any layer and no default.
    #[error("Missing required configuration value for {field}. Set {key}.")]
    MissingRequiredField { field: String, key: String },

    /// A field declares a custom type nobody registered a caster for.
    #[error("No caster registered for type '{type_name}' (field {field})")]
    UnsupportedType { field: String, type_name: String },

    /// A cast value did not satisfy the field's validation rule.
    #[error("Value for {field} ({key}) did not pass rule check '{rule}'")]
    RuleViolation {
        field: String,
        key: String,
        rule: String,
    },

    /// The field name is not declared on the instance's schema.
    #[error("Unknown configuration field: {0}")]
    UnknownField(String),

    /// A resolved value was requested as an incompatible Rust type.
    #[error("Field {field} holds a {actual} value, requested as {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// An env file exists but could not be read.
    #[error("Failed to read env file at {path}: {kind}")]
    EnvFileIo { path: PathBuf, kind: ErrorKind },
}

impl ConfigError {
    /// Name of the field the error concerns, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Cast { field, .. }
            | ConfigError::MissingRequiredField { field, .. }
            | ConfigError::UnsupportedType { field, .. }
            | ConfigError::RuleViolation { field, .. }
            | ConfigError::TypeMismatch { field, .. } => Some(field),
            ConfigError::UnknownField(field) => Some(field),
            ConfigError::EnvFileIo { .. } => None,
        }
    }
}
