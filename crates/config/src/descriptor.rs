//! Field descriptors and configuration schemas.
//!
//! Responsibilities:
//! - Describe each configuration field: name, lookup key, type, default, flags.
//! - Group descriptors into an ordered `ConfigSchema` with declarative key rules
//!   (prefix, exemptions, key style, schema-level defaults).
//! - Bind descriptors to concrete lookup keys for a given active environment.
//!
//! Does NOT handle:
//! - Looking up or casting values (see `resolver`).
//!
//! Invariants:
//! - Field names are unique within a schema; re-declaring a name replaces the
//!   earlier descriptor in place.
//! - Fields are required unless marked optional or given a default.
//! - An explicit lookup key is used verbatim; prefixes and key style only
//!   apply to keys derived from the field name.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::casting::{FieldType, Value};
use crate::environment::DeploymentEnv;

/// Produces a default value on demand.
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// A field's default: absent, a value, or a factory called when needed.
#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    Missing,
    Value(Value),
    Factory(DefaultFactory),
}

impl DefaultValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, DefaultValue::Missing)
    }

    /// The default value, calling the factory if there is one.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultValue::Missing => None,
            DefaultValue::Value(value) => Some(value.clone()),
            DefaultValue::Factory(factory) => Some(factory()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Missing => f.write_str("Missing"),
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// A named validation rule applied to cast values.
#[derive(Clone)]
pub struct Rule {
    name: String,
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Describes one configuration field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    key: Option<String>,
    field_type: FieldType,
    default: DefaultValue,
    required: bool,
    lazy: bool,
    null_is_missing: bool,
    rule: Option<Rule>,
    alternatives: BTreeMap<DeploymentEnv, String>,
}

impl FieldDescriptor {
    /// A required, eagerly resolved field with a key derived from `name`.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            key: None,
            field_type,
            default: DefaultValue::Missing,
            required: true,
            lazy: false,
            null_is_missing: false,
            rule: None,
            alternatives: BTreeMap::new(),
        }
    }

    /// Look the field up under `key` instead of the derived key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Use `value` when no layer supplies the field.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    /// Compute the default with `factory` when no layer supplies the field.
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Factory(Arc::new(factory));
        self
    }

    /// Resolve to `Missing` instead of failing when absent.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Defer resolution until the field is first read.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Treat a value that casts to `Value::Null` (`null`, `none`, empty) as
    /// absent, so the default applies or the field is missing.
    pub fn null_is_missing(mut self) -> Self {
        self.null_is_missing = true;
        self
    }

    /// Reject cast values for which `check` returns false.
    pub fn rule<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rule = Some(Rule {
            name: name.into(),
            check: Arc::new(check),
        });
        self
    }

    /// Use `key` while `env` is the most relevant environment with an alternative.
    pub fn key_for(mut self, env: DeploymentEnv, key: impl Into<String>) -> Self {
        self.alternatives.insert(env, key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_null_missing(&self) -> bool {
        self.null_is_missing
    }

    pub fn validation_rule(&self) -> Option<&Rule> {
        self.rule.as_ref()
    }
}

/// How keys are derived from field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// `db_host` -> `DB_HOST`
    #[default]
    Upper,
    Lower,
    AsIs,
}

impl KeyStyle {
    fn apply(self, key: &str) -> String {
        match self {
            KeyStyle::Upper => key.to_uppercase(),
            KeyStyle::Lower => key.to_lowercase(),
            KeyStyle::AsIs => key.to_string(),
        }
    }
}

/// An ordered set of field descriptors plus the rules for deriving their keys.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
    prefix: Option<String>,
    no_prefix: HashSet<String>,
    key_style: KeyStyle,
    defaults: HashMap<String, DefaultValue>,
}

impl ConfigSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a field. A field with the same name is replaced in place.
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        match self.fields.iter_mut().find(|f| f.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.fields.push(descriptor),
        }
        self
    }

    /// Prefix derived keys with `PREFIX_`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Exempt these field names from the prefix.
    pub fn no_prefix<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.no_prefix.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn key_style(mut self, style: KeyStyle) -> Self {
        self.key_style = style;
        self
    }

    /// Schema-level default for `field`, used when its descriptor has none.
    pub fn default_for(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults
            .insert(field.into(), DefaultValue::Value(value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The key `descriptor` is looked up under while `active` is the active environment.
    pub fn lookup_key(&self, descriptor: &FieldDescriptor, active: Option<DeploymentEnv>) -> String {
        if let Some(key) = active.and_then(|env| env.most_relevant(&descriptor.alternatives)) {
            return key.clone();
        }
        if let Some(key) = &descriptor.key {
            return key.clone();
        }
        let prefix = self
            .prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty() && !self.no_prefix.contains(&descriptor.name));
        match prefix {
            Some(prefix) => self.key_style.apply(&format!("{prefix}_{}", descriptor.name)),
            None => self.key_style.apply(&descriptor.name),
        }
    }

    /// Bind every descriptor to its lookup key and effective default.
    pub fn bind(&self, active: Option<DeploymentEnv>) -> Vec<BoundField> {
        self.fields
            .iter()
            .map(|descriptor| {
                let default = if descriptor.default.is_missing() {
                    self.defaults
                        .get(&descriptor.name)
                        .cloned()
                        .unwrap_or_default()
                } else {
                    descriptor.default.clone()
                };
                BoundField {
                    key: self.lookup_key(descriptor, active),
                    descriptor: descriptor.clone(),
                    default,
                }
            })
            .collect()
    }
}

/// A descriptor bound to its lookup key and effective default within a schema.
#[derive(Debug, Clone)]
pub struct BoundField {
    descriptor: FieldDescriptor,
    key: String,
    default: DefaultValue,
}

impl BoundField {
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }
}
