//! Environment-driven configuration resolution.
//!
//! This crate turns process environment variables and `.env`-style files
//! into typed configuration objects. Fields are declared with
//! [`FieldDescriptor`]s grouped into a [`ConfigSchema`]; a resolver looks
//! each field up in a [`ValueSource`], casts it through the
//! [`CastingRegistry`] and records it as a value or as
//! [`Resolved::Missing`].
//!
//! Whole schemas can be gated on the active [`DeploymentEnv`] with
//! [`EnvGatedResolver`], and individual fields can be resolved lazily on
//! first read.
//!
//! ```no_run
//! use envgate_config::{ConfigLoader, ConfigSchema, FieldDescriptor, FieldType};
//!
//! let schema = ConfigSchema::new("service")
//!     .field(FieldDescriptor::new("port", FieldType::Int))
//!     .field(FieldDescriptor::new("debug", FieldType::Bool).default(false));
//!
//! let config = ConfigLoader::new().load(&schema)?;
//! let port: Option<u16> = config.get("port")?;
//! # Ok::<(), envgate_config::ConfigError>(())
//! ```

pub mod casting;
pub mod constants;
pub mod descriptor;
pub mod environment;
mod error;
mod instance;
mod loader;
pub mod parser;
pub mod resolver;
pub mod source;

pub use casting::{CastFn, CastingRegistry, FieldType, FromValue, Resolved, Value};
pub use descriptor::{BoundField, ConfigSchema, DefaultValue, FieldDescriptor, KeyStyle, Rule};
pub use environment::{DeploymentEnv, EnvRequirement, UnknownEnvironment};
pub use error::ConfigError;
pub use instance::ConfigInstance;
pub use loader::ConfigLoader;
pub use parser::{ParsedEnvFile, RawMapping, parse_env_file, parse_env_file_report};
pub use resolver::{EnvGatedResolver, OptionalResolver};
pub use source::{Origin, ValueSource, ValueSourceBuilder};
