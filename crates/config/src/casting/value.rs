//! Typed configuration values and the `Missing` sentinel.

use secrecy::{ExposeSecret, SecretString};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use super::FieldType;
use crate::constants::REDACTED;
use crate::environment::DeploymentEnv;

/// A cast configuration value.
///
/// `Null` and `Str("")` are present values; absence is expressed by
/// [`Resolved::Missing`], never by a `Value`.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Path(PathBuf),
    Url(Url),
    Secret(SecretString),
    Env(DeploymentEnv),
    List(Vec<Value>),
    Null,
    /// Output of a registered custom caster.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Short name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Path(_) => "path",
            Value::Url(_) => "url",
            Value::Secret(_) => "secret",
            Value::Env(_) => "environment",
            Value::List(_) => "list",
            Value::Null => "null",
            Value::Custom(_) => "custom",
        }
    }

    /// Wrap the output of a custom caster.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Borrow a custom value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Whether this value already has type `target`, so no cast is needed.
    pub(crate) fn conforms_to(&self, target: &FieldType) -> bool {
        match (self, target) {
            (Value::Str(_), FieldType::Str)
            | (Value::Bool(_), FieldType::Bool)
            | (Value::Int(_), FieldType::Int)
            | (Value::Float(_), FieldType::Float)
            | (Value::Path(_), FieldType::Path)
            | (Value::Url(_), FieldType::Url)
            | (Value::Secret(_), FieldType::Secret)
            | (Value::Env(_), FieldType::Environment)
            | (Value::Null, FieldType::Null)
            | (Value::Custom(_), FieldType::Custom(_)) => true,
            (Value::Path(path), FieldType::ExistingPath) => path.exists(),
            (Value::Str(s), FieldType::Choice(options)) => options.contains(s),
            (Value::List(items), FieldType::List(inner)) => {
                items.iter().all(|item| item.conforms_to(inner))
            }
            (value, FieldType::Either(first, fallback)) => {
                value.conforms_to(first) || value.conforms_to(fallback)
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Url(a), Value::Url(b)) => a == b,
            (Value::Secret(a), Value::Secret(b)) => a.expose_secret() == b.expose_secret(),
            (Value::Env(a), Value::Env(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Secrets serialize as `REDACTED`; custom values as their kind.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Path(path) => serializer.serialize_str(&path.to_string_lossy()),
            Value::Url(url) => serializer.serialize_str(url.as_str()),
            Value::Secret(_) => serializer.serialize_str(REDACTED),
            Value::Env(env) => env.serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Null => serializer.serialize_none(),
            Value::Custom(_) => serializer.serialize_str("<custom>"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::Path(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<DeploymentEnv> for Value {
    fn from(value: DeploymentEnv) -> Self {
        Value::Env(value)
    }
}

/// The outcome of resolving one field: a value, or the `Missing` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Present(Value),
    /// No layer supplied the field and it has no default.
    Missing,
}

impl Resolved {
    pub fn is_missing(&self) -> bool {
        matches!(self, Resolved::Missing)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::Missing => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::Missing => None,
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Present(value)
    }
}

/// Extraction of a Rust type from a resolved [`Value`].
pub trait FromValue: Sized {
    /// Name used in `TypeMismatch` errors.
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(x),
            Value::Int(i) => Some(i as f64),
            _ => None,
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i64, i32, u16, u32, u64, usize);

impl FromValue for PathBuf {
    const EXPECTED: &'static str = "path";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl FromValue for Url {
    const EXPECTED: &'static str = "url";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Url(url) => Some(url),
            _ => None,
        }
    }
}

impl FromValue for SecretString {
    const EXPECTED: &'static str = "secret";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Secret(secret) => Some(secret),
            _ => None,
        }
    }
}

impl FromValue for DeploymentEnv {
    const EXPECTED: &'static str = "environment";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Env(env) => Some(env),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// `Value::Null` extracts as `None`.
impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = "nullable value";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
