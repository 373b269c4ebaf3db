//! Casting raw strings into typed configuration values.
//!
//! Responsibilities:
//! - Describe target types (`FieldType`), including composites.
//! - Convert raw strings to `Value`s via the `CastingRegistry`.
//! - Hold the `Missing`-aware `Resolved` slot type and `FromValue` extraction.
//!
//! Does NOT handle:
//! - Looking values up (see `source.rs`) or deciding defaults (see `resolver`).
//!
//! Invariants:
//! - Cast failure reasons never contain the raw value; callers attach it, redacted if secret.
//! - Values that already have the target type are passed through uncast.

mod builtin;
mod registry;
mod value;

pub use registry::{CastFn, CastingRegistry};
pub use value::{FromValue, Resolved, Value};

use std::fmt;
use thiserror::Error;

/// The declared semantic type of a configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Any string, taken verbatim.
    Str,
    /// `true/1/yes/on` or `false/0/no/off/""`, case-insensitive.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// A filesystem path, not checked.
    Path,
    /// A filesystem path that must exist when cast.
    ExistingPath,
    /// An absolute URL.
    Url,
    /// A string kept in a `SecretString` and redacted in output.
    Secret,
    /// `null`, `none` or the empty string.
    Null,
    /// A deployment environment name.
    Environment,
    /// Comma-separated elements of the inner type.
    List(Box<FieldType>),
    /// Exactly one of the listed strings.
    Choice(Vec<String>),
    /// The first type, falling back to the second if the first cast fails.
    Either(Box<FieldType>, Box<FieldType>),
    /// A type whose caster is registered by name.
    Custom(String),
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn either(first: FieldType, fallback: FieldType) -> Self {
        FieldType::Either(Box::new(first), Box::new(fallback))
    }

    /// `inner`, or `Value::Null` for null tokens.
    pub fn nullable(inner: FieldType) -> Self {
        Self::either(inner, FieldType::Null)
    }

    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Choice(options.into_iter().map(Into::into).collect())
    }

    pub fn custom(name: impl Into<String>) -> Self {
        FieldType::Custom(name.into())
    }

    /// Whether raw values of this type must be redacted.
    pub fn is_secret(&self) -> bool {
        match self {
            FieldType::Secret => true,
            FieldType::List(inner) => inner.is_secret(),
            FieldType::Either(first, fallback) => first.is_secret() || fallback.is_secret(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Str => f.write_str("string"),
            FieldType::Bool => f.write_str("bool"),
            FieldType::Int => f.write_str("int"),
            FieldType::Float => f.write_str("float"),
            FieldType::Path => f.write_str("path"),
            FieldType::ExistingPath => f.write_str("existing path"),
            FieldType::Url => f.write_str("url"),
            FieldType::Secret => f.write_str("secret"),
            FieldType::Null => f.write_str("null"),
            FieldType::Environment => f.write_str("environment"),
            FieldType::List(inner) => write!(f, "list<{inner}>"),
            FieldType::Choice(options) => write!(f, "one of [{}]", options.join(", ")),
            FieldType::Either(first, fallback) => write!(f, "{first} | {fallback}"),
            FieldType::Custom(name) => f.write_str(name),
        }
    }
}

/// Why a single cast failed, without field context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastFailure {
    #[error("{reason}")]
    Invalid { expected: String, reason: String },

    #[error("no caster registered for type '{0}'")]
    Unsupported(String),
}

impl CastFailure {
    pub(crate) fn invalid(expected: &FieldType, reason: impl fmt::Display) -> Self {
        CastFailure::Invalid {
            expected: expected.to_string(),
            reason: reason.to_string(),
        }
    }
}
