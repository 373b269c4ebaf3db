//! The casting registry: built-in casts plus named custom casters.

use secrecy::SecretString;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use super::builtin::{is_null_token, parse_bool, split_list};
use super::{CastFailure, FieldType, Value};
use crate::environment::DeploymentEnv;

/// A caster for a custom type. The error string is the failure reason and
/// must not repeat the raw input.
pub type CastFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Converts raw strings into [`Value`]s for a [`FieldType`].
///
/// Built-in types are always available. Custom types are looked up by name
/// when a value is cast, so an unregistered type only fails once a field of
/// that type actually needs casting. Cloning is cheap.
#[derive(Clone, Default)]
pub struct CastingRegistry {
    custom: Arc<HashMap<String, CastFn>>,
}

impl fmt::Debug for CastingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CastingRegistry")
            .field("custom", &names)
            .finish()
    }
}

impl CastingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the caster for `FieldType::Custom(name)`.
    pub fn register<F>(mut self, name: impl Into<String>, caster: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.custom).insert(name.into(), Arc::new(caster));
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Cast `raw` to `target`.
    pub fn cast(&self, raw: &str, target: &FieldType) -> Result<Value, CastFailure> {
        match target {
            FieldType::Str => Ok(Value::Str(raw.to_string())),
            FieldType::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| CastFailure::invalid(target, "expected true/false, 1/0, yes/no or on/off")),
            FieldType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| CastFailure::invalid(target, e)),
            FieldType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| CastFailure::invalid(target, e)),
            FieldType::Path => Ok(Value::Path(PathBuf::from(raw))),
            FieldType::ExistingPath => {
                let path = PathBuf::from(raw);
                if path.exists() {
                    Ok(Value::Path(path))
                } else {
                    Err(CastFailure::invalid(target, "path does not exist"))
                }
            }
            FieldType::Url => Url::parse(raw.trim())
                .map(Value::Url)
                .map_err(|e| CastFailure::invalid(target, e)),
            FieldType::Secret => Ok(Value::Secret(SecretString::new(raw.into()))),
            FieldType::Null => {
                if is_null_token(raw) {
                    Ok(Value::Null)
                } else {
                    Err(CastFailure::invalid(target, "expected null, none or an empty value"))
                }
            }
            FieldType::Environment => raw
                .parse::<DeploymentEnv>()
                .map(Value::Env)
                .map_err(|_| CastFailure::invalid(target, "unknown deployment environment")),
            FieldType::List(inner) => {
                let items = split_list(raw).map_err(|reason| CastFailure::invalid(target, reason))?;
                items
                    .iter()
                    .map(|item| self.cast(item, inner))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            FieldType::Choice(options) => options
                .iter()
                .find(|option| option.as_str() == raw)
                .map(|option| Value::Str(option.clone()))
                .ok_or_else(|| {
                    CastFailure::invalid(target, "value does not match any allowed option")
                }),
            FieldType::Either(first, fallback) => self.cast_either(raw, target, first, fallback),
            FieldType::Custom(name) => {
                let caster = self
                    .custom
                    .get(name)
                    .ok_or_else(|| CastFailure::Unsupported(name.clone()))?;
                caster(raw).map_err(|reason| CastFailure::invalid(target, reason))
            }
        }
    }

    /// Bring an already-typed value (such as a default) to `target`.
    ///
    /// Conforming values pass through untouched; strings are cast; integers
    /// widen to floats; anything else is a failure.
    pub fn coerce(&self, value: Value, target: &FieldType) -> Result<Value, CastFailure> {
        if value.conforms_to(target) {
            return Ok(value);
        }
        match value {
            Value::Str(raw) => self.cast(&raw, target),
            Value::Int(n) if accepts_float(target) => Ok(Value::Float(n as f64)),
            other => Err(CastFailure::invalid(
                target,
                format!("a {} value cannot be used as {target}", other.kind()),
            )),
        }
    }

    fn cast_either(
        &self,
        raw: &str,
        target: &FieldType,
        first: &FieldType,
        fallback: &FieldType,
    ) -> Result<Value, CastFailure> {
        let first_failure = match self.cast(raw, first) {
            Ok(value) => return Ok(value),
            Err(unsupported @ CastFailure::Unsupported(_)) => return Err(unsupported),
            Err(failure) => failure,
        };
        self.cast(raw, fallback).map_err(|second| match second {
            CastFailure::Unsupported(_) => second,
            CastFailure::Invalid { .. } => {
                CastFailure::invalid(target, format!("{first_failure}; {second}"))
            }
        })
    }
}

fn accepts_float(target: &FieldType) -> bool {
    match target {
        FieldType::Float => true,
        FieldType::Either(first, fallback) => accepts_float(first) || accepts_float(fallback),
        _ => false,
    }
}
