//! Integration tests for end-to-end configuration loading.
//!
//! These tests drive the public API the way an application would: declare a
//! schema, point a `ConfigLoader` at an env file and a process environment,
//! and read typed values back.

use envgate_config::{
    CastingRegistry, ConfigError, ConfigLoader, ConfigSchema, DeploymentEnv, EnvRequirement,
    FieldDescriptor, FieldType, KeyStyle, Resolved, Value,
};
use secrecy::{ExposeSecret, SecretString};
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn env_file(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join(".env");
    fs::write(&path, contents).expect("write env file");
    path
}

/// Process environment overrides the env file; quoted file values are unquoted
/// before casting.
#[test]
#[serial]
fn test_process_env_overrides_file_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let path = env_file(&temp_dir, "PORT=8080\nDEBUG='true'\n");

    let schema = ConfigSchema::new("service")
        .field(FieldDescriptor::new("port", FieldType::Int))
        .field(FieldDescriptor::new("debug", FieldType::Bool).default(false));

    let config = ConfigLoader::new()
        .with_mapping([("PORT", "9090")])
        .with_env_file(&path)
        .load(&schema)
        .expect("should resolve");

    assert_eq!(config.get::<i64>("port"), Ok(Some(9090)));
    assert_eq!(config.get::<bool>("debug"), Ok(Some(true)));
}

/// A realistic service schema using prefixes, composites and a secret.
#[test]
#[serial]
fn test_service_schema_with_prefix_and_composites() {
    let temp_dir = TempDir::new().unwrap();
    let path = env_file(
        &temp_dir,
        "# service settings\n\
         APP_HOSTS=db1:5432, \"db2:5432\"\n\
         APP_LOG_LEVEL=info # inline comment\n\
         APP_TOKEN=s3cr3t\n\
         APP_TIMEOUT=none\n\
         not a valid line\n\
         ENDPOINT=https://collector.example.com/v1\n",
    );

    let schema = ConfigSchema::new("app")
        .prefix("app")
        .no_prefix(["endpoint"])
        .field(FieldDescriptor::new("hosts", FieldType::list(FieldType::Str)))
        .field(FieldDescriptor::new(
            "log_level",
            FieldType::choice(["debug", "info", "warn"]),
        ))
        .field(FieldDescriptor::new("token", FieldType::Secret))
        .field(FieldDescriptor::new("timeout", FieldType::nullable(FieldType::Int)))
        .field(FieldDescriptor::new("endpoint", FieldType::Url))
        .field(FieldDescriptor::new("retries", FieldType::Int).optional());

    let config = ConfigLoader::new()
        .with_mapping::<_, &str, &str>([])
        .with_env_file(&path)
        .load(&schema)
        .expect("should resolve");

    assert_eq!(
        config.get::<Vec<String>>("hosts"),
        Ok(Some(vec!["db1:5432".to_string(), "db2:5432".to_string()]))
    );
    assert_eq!(config.get::<String>("log_level"), Ok(Some("info".into())));
    let token = config.get::<SecretString>("token").unwrap().unwrap();
    assert_eq!(token.expose_secret(), "s3cr3t");
    assert_eq!(config.get::<Option<i64>>("timeout"), Ok(Some(None)));
    assert_eq!(
        config.get::<url::Url>("endpoint").unwrap().map(|u| u.host_str().map(String::from)),
        Some(Some("collector.example.com".to_string()))
    );
    assert_eq!(config.is_missing("retries"), Ok(true));

    let json = config.to_json().expect("json");
    assert_eq!(json["token"], "[REDACTED]");
    assert!(json.get("retries").is_none());
    assert!(!json.to_string().contains("s3cr3t"));
}

/// The active environment picks per-field key alternatives and gates schemas.
#[test]
#[serial]
fn test_environment_selects_keys_and_gates_schemas() {
    let base = [
        ("ENV", "staging"),
        ("DB_URL", "postgres://localhost/dev"),
        ("PROD_DB_URL", "postgres://prod/main"),
        ("QA_SEED", "42"),
    ];

    let db = ConfigSchema::new("db").field(
        FieldDescriptor::new("url", FieldType::Str)
            .key("DB_URL")
            .key_for(DeploymentEnv::Prod, "PROD_DB_URL"),
    );
    let qa_only = ConfigSchema::new("seed").field(FieldDescriptor::new("qa_seed", FieldType::Int));

    let staging = ConfigLoader::new().without_env_file().with_mapping(base);
    assert_eq!(staging.active_environment(), DeploymentEnv::Staging);
    assert_eq!(
        staging.load(&db).unwrap().get::<String>("url"),
        Ok(Some("postgres://localhost/dev".into()))
    );
    assert!(
        staging
            .load_for(&qa_only, &EnvRequirement::Exactly(DeploymentEnv::Qa))
            .unwrap()
            .is_all_missing()
    );

    let mut prod_vars = base.to_vec();
    prod_vars[0] = ("ENV", "production");
    let prod = ConfigLoader::new().without_env_file().with_mapping(prod_vars);
    assert_eq!(
        prod.load(&db).unwrap().get::<String>("url"),
        Ok(Some("postgres://prod/main".into()))
    );
    assert_eq!(
        prod.load_for(&qa_only, &EnvRequirement::UpTo(DeploymentEnv::Qa))
            .unwrap()
            .field("qa_seed"),
        Ok(Resolved::Missing)
    );
}

/// Gated schemas never cast when the requirement fails.
#[test]
fn test_gated_schema_never_invokes_casters() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry = CastingRegistry::new().register("counted", move |raw| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Str(raw.to_string()))
    });

    let schema = ConfigSchema::new("qa_tools")
        .field(FieldDescriptor::new("fixture", FieldType::custom("counted")))
        .field(FieldDescriptor::new("report", FieldType::custom("counted")).lazy());

    let loader = ConfigLoader::new()
        .without_env_file()
        .with_mapping([("ENV", "dev"), ("FIXTURE", "a"), ("REPORT", "b")])
        .with_registry(registry);

    let instance = loader
        .load_for(&schema, &EnvRequirement::Exactly(DeploymentEnv::Qa))
        .unwrap();
    assert!(instance.is_all_missing());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let instance = loader.load_for(&schema, &EnvRequirement::Any).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(instance.get::<String>("report"), Ok(Some("b".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Errors name the field and key but never echo secret values.
#[test]
fn test_errors_identify_field_without_leaking_secrets() {
    let schema = ConfigSchema::new("auth")
        .key_style(KeyStyle::AsIs)
        .field(FieldDescriptor::new("api_tokens", FieldType::list(FieldType::Secret)))
        .field(FieldDescriptor::new("Region", FieldType::Str));

    let err = ConfigLoader::new()
        .without_env_file()
        .with_mapping([("api_tokens", "'tok-123, tok-456")])
        .load(&schema)
        .unwrap_err();

    assert_eq!(err.field(), Some("api_tokens"));
    assert!(!err.to_string().contains("tok-123"));

    let err = ConfigLoader::new()
        .without_env_file()
        .with_mapping([("api_tokens", "a,b")])
        .load(&schema)
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingRequiredField {
            field: "Region".into(),
            key: "Region".into(),
        }
    );
}

/// Defaults from factories run only when the key is absent.
#[test]
fn test_default_factory_and_schema_defaults() {
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);
    let schema = ConfigSchema::new("worker")
        .default_for("threads", 4)
        .field(FieldDescriptor::new("threads", FieldType::Int))
        .field(FieldDescriptor::new("queue", FieldType::Str).default_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Str("default-queue".into())
        }));

    let loader = ConfigLoader::new().without_env_file();

    let config = loader
        .clone()
        .with_mapping([("QUEUE", "jobs")])
        .load(&schema)
        .unwrap();
    assert_eq!(config.get::<String>("queue"), Ok(Some("jobs".into())));
    assert_eq!(config.get::<usize>("threads"), Ok(Some(4)));
    assert_eq!(produced.load(Ordering::SeqCst), 0);

    let config = loader.with_mapping::<_, &str, &str>([]).load(&schema).unwrap();
    assert_eq!(config.get::<String>("queue"), Ok(Some("default-queue".into())));
    assert_eq!(produced.load(Ordering::SeqCst), 1);
}
