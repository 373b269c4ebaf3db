//! The optional resolver.

use std::sync::Arc;
use tracing::trace;

use crate::casting::{CastFailure, CastingRegistry, Resolved, Value};
use crate::constants::REDACTED;
use crate::descriptor::{BoundField, ConfigSchema};
use crate::environment::DeploymentEnv;
use crate::error::ConfigError;
use crate::instance::{ConfigInstance, LazyField, Slot};
use crate::source::ValueSource;

/// Resolves schemas field by field: source value, then default, then
/// `Missing` (optional fields) or an error (required fields).
#[derive(Debug, Clone, Default)]
pub struct OptionalResolver {
    registry: CastingRegistry,
    environment: Option<DeploymentEnv>,
}

impl OptionalResolver {
    pub fn new(registry: CastingRegistry) -> Self {
        Self {
            registry,
            environment: None,
        }
    }

    /// Select per-environment key alternatives for `env`.
    pub fn with_environment(mut self, env: DeploymentEnv) -> Self {
        self.environment = Some(env);
        self
    }

    pub fn registry(&self) -> &CastingRegistry {
        &self.registry
    }

    pub fn environment(&self) -> Option<DeploymentEnv> {
        self.environment
    }

    /// Resolve every field of `schema` against `source`.
    ///
    /// Lazy fields are not looked up here; they keep a handle on `source`
    /// and resolve on first read.
    ///
    /// # Errors
    ///
    /// The first `Cast`, `RuleViolation`, `UnsupportedType` or
    /// `MissingRequiredField` error among the eager fields. No instance is
    /// returned in that case.
    pub fn resolve(
        &self,
        schema: &ConfigSchema,
        source: Arc<ValueSource>,
    ) -> Result<ConfigInstance, ConfigError> {
        let mut slots = Vec::with_capacity(schema.len());
        for field in schema.bind(self.environment) {
            let name = field.name().to_string();
            let slot = if field.descriptor().is_lazy() {
                Slot::Deferred(LazyField::new(field, self.clone(), Arc::clone(&source)))
            } else {
                Slot::Ready(self.resolve_field(&field, &source)?)
            };
            slots.push((name, slot));
        }
        Ok(ConfigInstance::new(schema.name(), self.environment, slots))
    }

    /// Resolve a single bound field.
    pub fn resolve_field(
        &self,
        field: &BoundField,
        source: &ValueSource,
    ) -> Result<Resolved, ConfigError> {
        let descriptor = field.descriptor();
        let target = descriptor.field_type();

        if let Some((raw, origin)) = source.lookup_with_origin(field.key()) {
            trace!(field = field.name(), key = field.key(), %origin, "field found");
            let value = self
                .registry
                .cast(&raw, target)
                .map_err(|failure| field_error(field, &raw, failure))?;
            if matches!(value, Value::Null) && descriptor.is_null_missing() {
                trace!(field = field.name(), key = field.key(), "null value treated as absent");
            } else {
                check_rule(field, &value)?;
                return Ok(Resolved::Present(value));
            }
        }

        if let Some(default) = field.default_value().produce() {
            trace!(field = field.name(), key = field.key(), "using default");
            let value = self
                .registry
                .coerce(default, target)
                .map_err(|failure| field_error(field, "<default>", failure))?;
            return Ok(Resolved::Present(value));
        }

        if descriptor.is_required() {
            return Err(ConfigError::MissingRequiredField {
                field: field.name().to_string(),
                key: field.key().to_string(),
            });
        }
        trace!(field = field.name(), key = field.key(), "field missing");
        Ok(Resolved::Missing)
    }
}

fn check_rule(field: &BoundField, value: &Value) -> Result<(), ConfigError> {
    match field.descriptor().validation_rule() {
        Some(rule) if !rule.check(value) => Err(ConfigError::RuleViolation {
            field: field.name().to_string(),
            key: field.key().to_string(),
            rule: rule.name().to_string(),
        }),
        _ => Ok(()),
    }
}

fn field_error(field: &BoundField, raw: &str, failure: CastFailure) -> ConfigError {
    match failure {
        CastFailure::Unsupported(type_name) => ConfigError::UnsupportedType {
            field: field.name().to_string(),
            type_name,
        },
        CastFailure::Invalid { expected, reason } => {
            let raw = if field.descriptor().field_type().is_secret() {
                REDACTED.to_string()
            } else {
                raw.to_string()
            };
            ConfigError::Cast {
                field: field.name().to_string(),
                key: field.key().to_string(),
                raw,
                expected,
                reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casting::FieldType;
    use crate::descriptor::FieldDescriptor;
    use secrecy::ExposeSecret;

    fn source<const N: usize>(vars: [(&str, &str); N]) -> Arc<ValueSource> {
        Arc::new(ValueSource::from_mapping(vars))
    }

    #[test]
    fn test_source_value_then_default_then_missing() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("host", FieldType::Str))
            .field(FieldDescriptor::new("port", FieldType::Int).default(8080))
            .field(FieldDescriptor::new("region", FieldType::Str).optional());

        let instance = OptionalResolver::default()
            .resolve(&schema, source([("HOST", "db.internal")]))
            .unwrap();

        assert_eq!(instance.get::<String>("host"), Ok(Some("db.internal".into())));
        assert_eq!(instance.get::<i64>("port"), Ok(Some(8080)));
        assert_eq!(instance.field("region"), Ok(Resolved::Missing));
    }

    #[test]
    fn test_empty_string_is_present_not_missing() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("suffix", FieldType::Str).optional());

        let instance = OptionalResolver::default()
            .resolve(&schema, source([("SUFFIX", "")]))
            .unwrap();

        assert_eq!(
            instance.field("suffix"),
            Ok(Resolved::Present(Value::Str(String::new())))
        );
    }

    #[test]
    fn test_required_field_absent_fails_with_key() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("api_url", FieldType::Url).key("SERVICE_URL"));

        let err = OptionalResolver::default()
            .resolve(&schema, source([]))
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::MissingRequiredField {
                field: "api_url".into(),
                key: "SERVICE_URL".into(),
            }
        );
    }

    #[test]
    fn test_cast_error_is_fatal_and_names_field() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("name", FieldType::Str))
            .field(FieldDescriptor::new("debug", FieldType::Bool));

        let err = OptionalResolver::default()
            .resolve(&schema, source([("NAME", "svc"), ("DEBUG", "maybe")]))
            .unwrap_err();

        match err {
            ConfigError::Cast { field, key, raw, expected, .. } => {
                assert_eq!(field, "debug");
                assert_eq!(key, "DEBUG");
                assert_eq!(raw, "maybe");
                assert_eq!(expected, "bool");
            }
            other => panic!("expected Cast error, got {other}"),
        }
    }

    #[test]
    fn test_secret_cast_error_redacts_raw_value() {
        let schema = ConfigSchema::new("app").field(
            FieldDescriptor::new("tokens", FieldType::list(FieldType::Secret)),
        );

        let err = OptionalResolver::default()
            .resolve(&schema, source([("TOKENS", "\"abc-secret")]))
            .unwrap_err();

        assert!(!err.to_string().contains("abc-secret"));
        assert!(matches!(err, ConfigError::Cast { ref raw, .. } if raw == REDACTED));
    }

    #[test]
    fn test_unregistered_type_fails_at_resolution() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("window", FieldType::custom("duration")));

        let err = OptionalResolver::default()
            .resolve(&schema, source([("WINDOW", "5m")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedType {
                field: "window".into(),
                type_name: "duration".into(),
            }
        );

        // Absent values are never cast, so the missing caster goes unnoticed.
        let unused = OptionalResolver::default().resolve(&schema, source([]));
        assert!(matches!(unused, Err(ConfigError::MissingRequiredField { .. })));
    }

    #[test]
    fn test_null_is_missing_falls_back_to_default_or_missing() {
        let nullable_int = FieldType::nullable(FieldType::Int);
        let schema = ConfigSchema::new("app")
            .field(
                FieldDescriptor::new("limit", nullable_int.clone())
                    .null_is_missing()
                    .default(10),
            )
            .field(
                FieldDescriptor::new("quota", nullable_int.clone())
                    .null_is_missing()
                    .optional(),
            )
            .field(FieldDescriptor::new("burst", nullable_int).optional());

        let instance = OptionalResolver::default()
            .resolve(
                &schema,
                source([("LIMIT", "none"), ("QUOTA", "null"), ("BURST", "")]),
            )
            .unwrap();

        assert_eq!(instance.get::<i64>("limit"), Ok(Some(10)));
        assert_eq!(instance.field("quota"), Ok(Resolved::Missing));
        assert_eq!(instance.field("burst"), Ok(Resolved::Present(Value::Null)));

        let present = OptionalResolver::default()
            .resolve(&schema, source([("LIMIT", "25"), ("QUOTA", "3")]))
            .unwrap();
        assert_eq!(present.get::<i64>("limit"), Ok(Some(25)));
        assert_eq!(present.get::<i64>("quota"), Ok(Some(3)));
    }

    #[test]
    fn test_null_is_missing_on_required_field_fails() {
        let schema = ConfigSchema::new("app").field(
            FieldDescriptor::new("region", FieldType::nullable(FieldType::Url)).null_is_missing(),
        );

        let err = OptionalResolver::default()
            .resolve(&schema, source([("REGION", "none")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRequiredField {
                field: "region".into(),
                key: "REGION".into(),
            }
        );
    }

    #[test]
    fn test_int_default_on_float_field() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("ratio", FieldType::Float).default(1));

        let instance = OptionalResolver::default().resolve(&schema, source([])).unwrap();
        assert_eq!(instance.get::<f64>("ratio"), Ok(Some(1.0)));
        assert_eq!(instance.field("ratio"), Ok(Resolved::Present(Value::Float(1.0))));
    }

    #[test]
    fn test_rule_violation() {
        let schema = ConfigSchema::new("app").field(
            FieldDescriptor::new("workers", FieldType::Int)
                .rule("positive", |v| matches!(v, Value::Int(n) if *n > 0)),
        );

        let ok = OptionalResolver::default()
            .resolve(&schema, source([("WORKERS", "4")]))
            .unwrap();
        assert_eq!(ok.get::<i64>("workers"), Ok(Some(4)));

        let err = OptionalResolver::default()
            .resolve(&schema, source([("WORKERS", "0")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::RuleViolation {
                field: "workers".into(),
                key: "WORKERS".into(),
                rule: "positive".into(),
            }
        );
    }

    #[test]
    fn test_string_default_is_cast_to_target_type() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("hosts", FieldType::list(FieldType::Str)).default("a,b"));

        let instance = OptionalResolver::default().resolve(&schema, source([])).unwrap();
        assert_eq!(
            instance.get::<Vec<String>>("hosts"),
            Ok(Some(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn test_environment_alternative_key() {
        let schema = ConfigSchema::new("db").field(
            FieldDescriptor::new("password", FieldType::Secret)
                .key_for(DeploymentEnv::Prod, "PROD_DB_PASSWORD"),
        );
        let vars = source([("PASSWORD", "dev-pw"), ("PROD_DB_PASSWORD", "prod-pw")]);

        let dev = OptionalResolver::default()
            .with_environment(DeploymentEnv::Dev)
            .resolve(&schema, Arc::clone(&vars))
            .unwrap();
        let prod = OptionalResolver::default()
            .with_environment(DeploymentEnv::Prod)
            .resolve(&schema, vars)
            .unwrap();

        let dev_pw = dev.get::<secrecy::SecretString>("password").unwrap().unwrap();
        let prod_pw = prod.get::<secrecy::SecretString>("password").unwrap().unwrap();
        assert_eq!(dev_pw.expose_secret(), "dev-pw");
        assert_eq!(prod_pw.expose_secret(), "prod-pw");
    }

    #[test]
    fn test_lazy_field_errors_surface_on_read() {
        let schema = ConfigSchema::new("app")
            .field(FieldDescriptor::new("name", FieldType::Str))
            .field(FieldDescriptor::new("port", FieldType::Int).lazy());

        let instance = OptionalResolver::default()
            .resolve(&schema, source([("NAME", "svc"), ("PORT", "eighty")]))
            .unwrap();

        assert_eq!(instance.is_evaluated("port"), Ok(false));
        let first = instance.field("port");
        let second = instance.field("port");
        assert!(matches!(first, Err(ConfigError::Cast { .. })));
        assert_eq!(first, second);
        assert_eq!(instance.is_evaluated("port"), Ok(true));
    }
}
