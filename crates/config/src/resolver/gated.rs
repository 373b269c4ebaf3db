//! The environment-gated resolver.

use std::sync::Arc;
use tracing::debug;

use super::OptionalResolver;
use crate::descriptor::ConfigSchema;
use crate::environment::{DeploymentEnv, EnvRequirement};
use crate::error::ConfigError;
use crate::instance::ConfigInstance;
use crate::source::ValueSource;

/// Resolves a schema only when its environment requirement holds.
///
/// A mismatch is not an error: every field comes back `Missing` and the
/// value source is never consulted.
#[derive(Debug, Clone, Default)]
pub struct EnvGatedResolver {
    inner: OptionalResolver,
}

impl EnvGatedResolver {
    pub fn new(inner: OptionalResolver) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &OptionalResolver {
        &self.inner
    }

    /// Resolve `schema` if `requirement` matches `active`.
    ///
    /// # Errors
    ///
    /// Any error of [`OptionalResolver::resolve`], only when the
    /// requirement matches.
    pub fn resolve(
        &self,
        schema: &ConfigSchema,
        source: Arc<ValueSource>,
        requirement: &EnvRequirement,
        active: DeploymentEnv,
    ) -> Result<ConfigInstance, ConfigError> {
        if !requirement.matches(active) {
            debug!(
                schema = schema.name(),
                %requirement,
                %active,
                "environment requirement not met, skipping resolution"
            );
            return Ok(ConfigInstance::all_missing(schema, Some(active)));
        }
        self.inner
            .clone()
            .with_environment(active)
            .resolve(schema, source)
    }
}
