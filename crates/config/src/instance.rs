//! Resolved configuration instances and lazily resolved fields.
//!
//! Responsibilities:
//! - Hold each resolved field as a value or `Missing`, in declaration order.
//! - Defer lazy fields until first read, then cache the outcome for the
//!   instance's lifetime.
//! - Extract typed values and render a redacted JSON view.
//!
//! Does NOT handle:
//! - The resolution steps themselves (see `resolver`).
//!
//! Invariants:
//! - A lazy field is resolved at most once per instance, even under concurrent
//!   first reads; every read observes the same outcome (value or error).
//! - Once read, a lazy field never consults its value source again.

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::casting::{FromValue, Resolved};
use crate::descriptor::{BoundField, ConfigSchema};
use crate::environment::DeploymentEnv;
use crate::error::ConfigError;
use crate::resolver::OptionalResolver;
use crate::source::ValueSource;

/// A field whose resolution runs on first read.
pub(crate) struct LazyField {
    cell: OnceLock<Result<Resolved, ConfigError>>,
    field: BoundField,
    resolver: OptionalResolver,
    source: Arc<ValueSource>,
}

impl LazyField {
    pub(crate) fn new(field: BoundField, resolver: OptionalResolver, source: Arc<ValueSource>) -> Self {
        Self {
            cell: OnceLock::new(),
            field,
            resolver,
            source,
        }
    }

    fn get(&self) -> Result<Resolved, ConfigError> {
        self.cell
            .get_or_init(|| self.resolver.resolve_field(&self.field, &self.source))
            .clone()
    }

    fn is_evaluated(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for LazyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyField")
            .field("key", &self.field.key())
            .field("evaluated", &self.is_evaluated())
            .finish()
    }
}

#[derive(Debug)]
pub(crate) enum Slot {
    Ready(Resolved),
    Deferred(LazyField),
}

impl Slot {
    fn resolve(&self) -> Result<Resolved, ConfigError> {
        match self {
            Slot::Ready(resolved) => Ok(resolved.clone()),
            Slot::Deferred(lazy) => lazy.get(),
        }
    }
}

/// A resolved configuration: one value or `Missing` per declared field.
#[derive(Debug)]
pub struct ConfigInstance {
    schema: String,
    environment: Option<DeploymentEnv>,
    fields: Vec<(String, Slot)>,
    index: HashMap<String, usize>,
}

impl ConfigInstance {
    pub(crate) fn new(
        schema: &str,
        environment: Option<DeploymentEnv>,
        fields: Vec<(String, Slot)>,
    ) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self {
            schema: schema.to_string(),
            environment,
            fields,
            index,
        }
    }

    /// An instance with every field of `schema` set to `Missing`.
    pub(crate) fn all_missing(schema: &ConfigSchema, environment: Option<DeploymentEnv>) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|descriptor| (descriptor.name().to_string(), Slot::Ready(Resolved::Missing)))
            .collect();
        Self::new(schema.name(), environment, fields)
    }

    /// Name of the schema this instance was resolved from.
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// The environment the instance was resolved for, if one was set.
    pub fn environment(&self) -> Option<DeploymentEnv> {
        self.environment
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The resolved state of `name`, resolving it first if it is lazy.
    ///
    /// # Errors
    ///
    /// `UnknownField` if `name` is not declared; for lazy fields, any
    /// resolution error (cached, so every read returns the same error).
    pub fn field(&self, name: &str) -> Result<Resolved, ConfigError> {
        let idx = self
            .index
            .get(name)
            .ok_or_else(|| ConfigError::UnknownField(name.to_string()))?;
        self.fields[*idx].1.resolve()
    }

    /// The value of `name` as `T`, or `None` if the field is `Missing`.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        let Some(value) = self.field(name)?.into_value() else {
            return Ok(None);
        };
        let actual = value.kind();
        T::from_value(value)
            .map(Some)
            .ok_or_else(|| ConfigError::TypeMismatch {
                field: name.to_string(),
                expected: T::EXPECTED,
                actual,
            })
    }

    pub fn is_missing(&self, name: &str) -> Result<bool, ConfigError> {
        Ok(self.field(name)?.is_missing())
    }

    /// Whether every field is `Missing`. Lazy fields are resolved to check;
    /// a lazy field that fails to resolve does not count as missing.
    pub fn is_all_missing(&self) -> bool {
        self.fields
            .iter()
            .all(|(_, slot)| matches!(slot.resolve(), Ok(Resolved::Missing)))
    }

    /// Whether lazy field `name` has been resolved yet. Eager fields always have.
    pub fn is_evaluated(&self, name: &str) -> Result<bool, ConfigError> {
        let idx = self
            .index
            .get(name)
            .ok_or_else(|| ConfigError::UnknownField(name.to_string()))?;
        Ok(match &self.fields[*idx].1 {
            Slot::Ready(_) => true,
            Slot::Deferred(lazy) => lazy.is_evaluated(),
        })
    }

    /// A JSON object of present fields. Secrets are redacted, `Missing`
    /// fields omitted, and lazy fields resolved.
    pub fn to_json(&self) -> Result<JsonValue, ConfigError> {
        let mut map = Map::new();
        for (name, slot) in &self.fields {
            if let Resolved::Present(value) = slot.resolve()? {
                map.insert(
                    name.clone(),
                    serde_json::to_value(&value).unwrap_or(JsonValue::Null),
                );
            }
        }
        Ok(JsonValue::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casting::{FieldType, Value};
    use crate::descriptor::FieldDescriptor;

    fn schema() -> ConfigSchema {
        ConfigSchema::new("svc")
            .field(FieldDescriptor::new("name", FieldType::Str))
            .field(FieldDescriptor::new("port", FieldType::Int))
    }

    #[test]
    fn test_all_missing_instance() {
        let instance = ConfigInstance::all_missing(&schema(), Some(DeploymentEnv::Dev));

        assert_eq!(instance.len(), 2);
        assert!(instance.is_all_missing());
        assert_eq!(instance.field("port"), Ok(Resolved::Missing));
        assert_eq!(instance.get::<i64>("port"), Ok(None));
        assert_eq!(instance.to_json().unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_unknown_field() {
        let instance = ConfigInstance::all_missing(&schema(), None);
        assert_eq!(
            instance.field("nope"),
            Err(ConfigError::UnknownField("nope".into()))
        );
    }

    #[test]
    fn test_get_reports_type_mismatch() {
        let instance = ConfigInstance::new(
            "svc",
            None,
            vec![("port".into(), Slot::Ready(Resolved::Present(Value::Int(80))))],
        );

        assert_eq!(instance.get::<u16>("port"), Ok(Some(80)));
        assert_eq!(
            instance.get::<String>("port"),
            Err(ConfigError::TypeMismatch {
                field: "port".into(),
                expected: "string",
                actual: "int",
            })
        );
        let names: Vec<&str> = instance.names().collect();
        assert_eq!(names, vec!["port"]);
    }
}
