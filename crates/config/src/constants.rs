//! Centralized constants for envgate.
//!
//! Lookup keys and defaults shared by the loader, the value source and the
//! casting layer live here so there is one place to document them.

use crate::environment::DeploymentEnv;

// =============================================================================
// Environment selection
// =============================================================================

/// Process environment variable naming the active deployment environment.
pub const ACTIVE_ENV_KEY: &str = "ENV";

/// Environment assumed when `ACTIVE_ENV_KEY` is unset or unrecognized.
///
/// This is the lowest-relevance tag, so it is also the most permissive one
/// for relevance-bounded requirements.
pub const DEFAULT_ENVIRONMENT: DeploymentEnv = DeploymentEnv::Dev;

// =============================================================================
// Env files
// =============================================================================

/// Env file consulted by `ConfigLoader` unless overridden.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// When set to `1` or `true`, env-file layers are skipped entirely.
pub const DOTENV_DISABLED_VAR: &str = "DOTENV_DISABLED";

// =============================================================================
// Casting
// =============================================================================

/// Separator between elements of list-typed fields.
pub const LIST_DELIMITER: char = ',';

/// Placeholder used wherever a secret value would otherwise be rendered.
pub const REDACTED: &str = "[REDACTED]";
