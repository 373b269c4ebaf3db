//! High-level configuration loader.
//!
//! Responsibilities:
//! - Provide a builder-pattern `ConfigLoader` that assembles a value source
//!   (process environment or injected mapping, then an optional env file).
//! - Determine the active deployment environment.
//! - Resolve schemas with the optional or the environment-gated resolver.
//!
//! Does NOT handle:
//! - Env-file syntax (see `parser.rs`) or casting (see `casting`).
//!
//! Invariants / Assumptions:
//! - Process environment values take precedence over env-file values.
//! - The env file defaults to `.env`; a missing file is not an error.
//! - An env file bound to an environment requirement is read only when the
//!   requirement matches the active environment.
//! - The `DOTENV_DISABLED` variable is checked before any env file is read.
//! - The value source is built once per `load` call and shared with lazy fields.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::casting::CastingRegistry;
use crate::constants::{ACTIVE_ENV_KEY, DEFAULT_ENV_FILE};
use crate::descriptor::ConfigSchema;
use crate::environment::{DeploymentEnv, EnvRequirement};
use crate::error::ConfigError;
use crate::instance::ConfigInstance;
use crate::parser::RawMapping;
use crate::resolver::{EnvGatedResolver, OptionalResolver};
use crate::source::{ValueSource, ValueSourceBuilder};

/// Loads configuration schemas from the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_file: Option<PathBuf>,
    env_file_requirement: EnvRequirement,
    mapping: Option<RawMapping>,
    env_key: String,
    registry: CastingRegistry,
    case_insensitive: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader reading the live process environment and `.env`.
    pub fn new() -> Self {
        Self {
            env_file: Some(PathBuf::from(DEFAULT_ENV_FILE)),
            env_file_requirement: EnvRequirement::Any,
            mapping: None,
            env_key: ACTIVE_ENV_KEY.to_string(),
            registry: CastingRegistry::default(),
            case_insensitive: false,
        }
    }

    /// Read env-file values from `path` instead of `.env`.
    pub fn with_env_file(mut self, path: impl AsRef<Path>) -> Self {
        self.env_file = Some(path.as_ref().to_path_buf());
        self.env_file_requirement = EnvRequirement::Any;
        self
    }

    /// Read env-file values from `path` only while `requirement` matches the
    /// active environment.
    ///
    /// `with_env_file_for(".env", EnvRequirement::UpTo(DeploymentEnv::Dev))`
    /// keeps a developer `.env` out of staging and production, where only the
    /// process environment is used.
    pub fn with_env_file_for(
        mut self,
        path: impl AsRef<Path>,
        requirement: EnvRequirement,
    ) -> Self {
        self.env_file = Some(path.as_ref().to_path_buf());
        self.env_file_requirement = requirement;
        self
    }

    /// Do not read any env file.
    pub fn without_env_file(mut self) -> Self {
        self.env_file = None;
        self
    }

    /// Use a fixed mapping in place of the live process environment.
    pub fn with_mapping<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.mapping = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Read the active environment from `key` instead of `ENV`.
    pub fn with_env_key(mut self, key: impl Into<String>) -> Self {
        self.env_key = key.into();
        self
    }

    /// Use `registry` for casting (needed for `FieldType::Custom` fields).
    pub fn with_registry(mut self, registry: CastingRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Match keys ASCII case-insensitively.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Build the layered value source this loader reads from.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFileIo` if the env file exists but cannot be read.
    pub fn source(&self) -> Result<ValueSource, ConfigError> {
        let mut builder = self.process_builder();
        if let Some(path) = &self.env_file {
            let active = self.active_environment();
            if self.env_file_requirement.matches(active) {
                builder = builder.env_file(path)?;
            } else {
                debug!(
                    path = %path.display(),
                    %active,
                    requirement = %self.env_file_requirement,
                    "env file not used in the active environment"
                );
            }
        }
        Ok(builder.build())
    }

    /// The active deployment environment.
    ///
    /// Only the process layer is consulted, so no env file is read.
    pub fn active_environment(&self) -> DeploymentEnv {
        let source = self.process_builder().build();
        DeploymentEnv::active_from(&source, &self.env_key)
    }

    /// Resolve `schema` unconditionally.
    ///
    /// Per-environment key alternatives are selected for the active environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the env file cannot be read or any eager field
    /// fails to resolve.
    pub fn load(&self, schema: &ConfigSchema) -> Result<ConfigInstance, ConfigError> {
        let source = Arc::new(self.source()?);
        let active = DeploymentEnv::active_from(&source, &self.env_key);
        OptionalResolver::new(self.registry.clone())
            .with_environment(active)
            .resolve(schema, source)
    }

    /// Resolve `schema` only if `requirement` matches the active environment;
    /// otherwise every field is `Missing`.
    ///
    /// # Errors
    ///
    /// As [`ConfigLoader::load`], only when the requirement matches.
    pub fn load_for(
        &self,
        schema: &ConfigSchema,
        requirement: &EnvRequirement,
    ) -> Result<ConfigInstance, ConfigError> {
        let active = self.active_environment();
        let source = if requirement.matches(active) {
            self.source()?
        } else {
            // Nothing will be looked up, so the env file is not read.
            self.process_builder().build()
        };
        EnvGatedResolver::new(OptionalResolver::new(self.registry.clone())).resolve(
            schema,
            Arc::new(source),
            requirement,
            active,
        )
    }

    fn process_builder(&self) -> ValueSourceBuilder {
        let builder = ValueSource::builder().case_insensitive(self.case_insensitive);
        match &self.mapping {
            Some(values) => builder.mapping(values.clone()),
            None => builder.process_env(),
        }
    }
}
