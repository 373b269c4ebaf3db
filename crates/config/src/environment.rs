//! Deployment environments and environment requirements.
//!
//! Responsibilities:
//! - Define the closed set of deployment environments and their relevance order.
//! - Determine the active environment from a value source.
//! - Match a configuration's declared environment requirement against the active one.
//!
//! Does NOT handle:
//! - Resolving fields (see `resolver`).
//!
//! Invariants:
//! - Relevance order is `Dev < Test < Qa < Staging < Prod`; ranks are unique.
//! - An absent or unrecognized active-environment value falls back to `DEFAULT_ENVIRONMENT`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::constants::{ACTIVE_ENV_KEY, DEFAULT_ENVIRONMENT};
use crate::source::ValueSource;

/// A deployment environment tag.
///
/// Variants are declared in relevance order, so the derived `Ord` is the
/// relevance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnv {
    Dev,
    Test,
    Qa,
    Staging,
    Prod,
}

/// Returned when a string names no known deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown deployment environment '{0}'")]
pub struct UnknownEnvironment(pub String);

impl DeploymentEnv {
    /// All environments, lowest relevance first.
    pub const ALL: [DeploymentEnv; 5] = [
        DeploymentEnv::Dev,
        DeploymentEnv::Test,
        DeploymentEnv::Qa,
        DeploymentEnv::Staging,
        DeploymentEnv::Prod,
    ];

    /// Relevance rank, 0 for `Dev` up to 4 for `Prod`.
    pub fn rank(self) -> u8 {
        match self {
            DeploymentEnv::Dev => 0,
            DeploymentEnv::Test => 1,
            DeploymentEnv::Qa => 2,
            DeploymentEnv::Staging => 3,
            DeploymentEnv::Prod => 4,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Qa => "qa",
            DeploymentEnv::Staging => "staging",
            DeploymentEnv::Prod => "prod",
        }
    }

    /// Active environment read from `ACTIVE_ENV_KEY` in the process layer.
    pub fn active(source: &ValueSource) -> Self {
        Self::active_from(source, ACTIVE_ENV_KEY)
    }

    /// Active environment read from `key` in the process layer of `source`.
    ///
    /// Env files are not consulted: the deployment environment belongs to
    /// the process, not to a file that may be shared across deployments.
    pub fn active_from(source: &ValueSource, key: &str) -> Self {
        let Some(raw) = source.process_lookup(key) else {
            return DEFAULT_ENVIRONMENT;
        };
        raw.parse().unwrap_or_else(|_| {
            warn!(
                key,
                value = raw.trim(),
                fallback = %DEFAULT_ENVIRONMENT,
                "unrecognized deployment environment"
            );
            DEFAULT_ENVIRONMENT
        })
    }

    /// Picks the entry for the most relevant environment not exceeding `self`.
    ///
    /// An entry for `self` always wins; otherwise the closest less relevant
    /// one does. Returns `None` if every entry is more relevant than `self`.
    pub fn most_relevant<'a, T>(self, candidates: &'a BTreeMap<DeploymentEnv, T>) -> Option<&'a T> {
        candidates.range(..=self).next_back().map(|(_, value)| value)
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentEnv {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "local" => Ok(DeploymentEnv::Dev),
            "test" | "testing" => Ok(DeploymentEnv::Test),
            "qa" => Ok(DeploymentEnv::Qa),
            "staging" | "stage" | "stg" => Ok(DeploymentEnv::Staging),
            "prod" | "production" | "prd" => Ok(DeploymentEnv::Prod),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

/// The environment(s) a configuration declares itself relevant for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvRequirement {
    /// Wildcard: relevant in every environment.
    #[default]
    Any,
    /// Relevant only in this environment.
    Exactly(DeploymentEnv),
    /// Relevant in any of the listed environments.
    OneOf(Vec<DeploymentEnv>),
    /// Relevant while the active environment is at most this relevant.
    UpTo(DeploymentEnv),
    /// Relevant while the active environment is at least this relevant.
    AtLeast(DeploymentEnv),
}

impl EnvRequirement {
    /// Whether a configuration with this requirement applies in `active`.
    pub fn matches(&self, active: DeploymentEnv) -> bool {
        match self {
            EnvRequirement::Any => true,
            EnvRequirement::Exactly(env) => *env == active,
            EnvRequirement::OneOf(envs) => envs.contains(&active),
            EnvRequirement::UpTo(max) => active.rank() <= max.rank(),
            EnvRequirement::AtLeast(min) => active.rank() >= min.rank(),
        }
    }
}

impl From<DeploymentEnv> for EnvRequirement {
    fn from(env: DeploymentEnv) -> Self {
        EnvRequirement::Exactly(env)
    }
}

impl fmt::Display for EnvRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvRequirement::Any => f.write_str("any"),
            EnvRequirement::Exactly(env) => write!(f, "{env}"),
            EnvRequirement::OneOf(envs) => {
                let names: Vec<&str> = envs.iter().map(|e| e.as_str()).collect();
                write!(f, "one of [{}]", names.join(", "))
            }
            EnvRequirement::UpTo(max) => write!(f, "up to {max}"),
            EnvRequirement::AtLeast(min) => write!(f, "at least {min}"),
        }
    }
}
