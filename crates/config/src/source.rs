//! Layered value lookup over the process environment and env files.
//!
//! Responsibilities:
//! - Merge the process environment and parsed env files into one lookup.
//! - Load env files from disk, tolerating missing files.
//! - Optionally compare keys case-insensitively.
//!
//! Does NOT handle:
//! - Parsing env-file text (see `parser.rs`).
//! - Casting looked-up strings (see `casting`).
//!
//! Invariants:
//! - The process layer is always consulted first; env files follow in the order added.
//! - Empty strings are present values, not absences.
//! - The `DOTENV_DISABLED` variable is checked before any env file is read.
//! - `Debug` output and errors never include looked-up values.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::constants::DOTENV_DISABLED_VAR;
use crate::environment::{DeploymentEnv, EnvRequirement};
use crate::error::ConfigError;
use crate::parser::{RawMapping, parse_env_file_report};

/// Where a looked-up value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin<'a> {
    /// The process environment (live or injected).
    Process,
    /// An env-file layer, named by its origin label (usually the path).
    File(&'a str),
}

impl fmt::Display for Origin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Process => f.write_str("process environment"),
            Origin::File(name) => write!(f, "env file {name}"),
        }
    }
}

#[derive(Clone)]
enum ProcessLayer {
    Live,
    Fixed(RawMapping),
}

#[derive(Clone)]
struct FileLayer {
    origin: String,
    values: RawMapping,
}

/// An ordered set of value layers, consulted front to back.
#[derive(Clone)]
pub struct ValueSource {
    process: ProcessLayer,
    files: Vec<FileLayer>,
    case_insensitive: bool,
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let process = match &self.process {
            ProcessLayer::Live => "live".to_string(),
            ProcessLayer::Fixed(values) => format!("fixed({} keys)", values.len()),
        };
        let files: Vec<String> = self
            .files
            .iter()
            .map(|layer| format!("{} ({} keys)", layer.origin, layer.values.len()))
            .collect();
        f.debug_struct("ValueSource")
            .field("process", &process)
            .field("files", &files)
            .field("case_insensitive", &self.case_insensitive)
            .finish()
    }
}

impl Default for ValueSource {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ValueSource {
    /// Start building a value source.
    pub fn builder() -> ValueSourceBuilder {
        ValueSourceBuilder::default()
    }

    /// A source backed only by the live process environment.
    pub fn process() -> Self {
        Self::default()
    }

    /// A source whose process layer is a fixed mapping instead of the live environment.
    pub fn from_mapping<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::builder().mapping(vars).build()
    }

    /// Look up `key` across all layers.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.lookup_with_origin(key).map(|(value, _)| value)
    }

    /// Look up `key`, also reporting which layer answered.
    pub fn lookup_with_origin(&self, key: &str) -> Option<(String, Origin<'_>)> {
        if let Some(value) = self.process_lookup(key) {
            return Some((value, Origin::Process));
        }
        self.files.iter().find_map(|layer| {
            self.lookup_in(&layer.values, key)
                .map(|value| (value, Origin::File(&layer.origin)))
        })
    }

    /// Look up `key` in the process layer only.
    pub fn process_lookup(&self, key: &str) -> Option<String> {
        match &self.process {
            ProcessLayer::Fixed(values) => self.lookup_in(values, key),
            ProcessLayer::Live => std::env::var(key).ok().or_else(|| {
                if !self.case_insensitive {
                    return None;
                }
                std::env::vars()
                    .filter(|(name, _)| name.eq_ignore_ascii_case(key))
                    .min_by(|a, b| a.0.cmp(&b.0))
                    .map(|(_, value)| value)
            }),
        }
    }

    /// Number of env-file layers.
    pub fn file_layers(&self) -> usize {
        self.files.len()
    }

    /// Exact matches win; among case variants the smallest key is chosen.
    fn lookup_in(&self, values: &RawMapping, key: &str) -> Option<String> {
        if let Some(value) = values.get(key) {
            return Some(value.clone());
        }
        if !self.case_insensitive {
            return None;
        }
        values
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(key))
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, value)| value.clone())
    }
}

/// Builder for [`ValueSource`].
#[derive(Default)]
pub struct ValueSourceBuilder {
    process: Option<ProcessLayer>,
    files: Vec<FileLayer>,
    case_insensitive: bool,
}

impl ValueSourceBuilder {
    /// Use the live process environment as the process layer (the default).
    pub fn process_env(mut self) -> Self {
        self.process = Some(ProcessLayer::Live);
        self
    }

    /// Use a fixed mapping in place of the live process environment.
    pub fn mapping<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.process = Some(ProcessLayer::Fixed(values));
        self
    }

    /// Add an env-file layer from text already in memory.
    pub fn env_text(mut self, origin: impl Into<String>, text: &str) -> Self {
        let origin = origin.into();
        let parsed = parse_env_file_report(text);
        if !parsed.skipped_lines.is_empty() {
            debug!(
                origin = %origin,
                skipped = parsed.skipped_lines.len(),
                "env file contained malformed lines"
            );
        }
        self.files.push(FileLayer {
            origin,
            values: parsed.values,
        });
        self
    }

    /// Add an env-file layer read from `path`.
    ///
    /// A missing file is skipped. If `DOTENV_DISABLED` is `1` or `true`, the
    /// file is not read at all.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFileIo` if the file exists but cannot be read.
    pub fn env_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if dotenv_disabled() {
            debug!(path = %path.display(), "env file loading disabled");
            return Ok(self);
        }

        match std::fs::read_to_string(path) {
            Ok(text) => Ok(self.env_text(path.display().to_string(), &text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "env file not found, skipping");
                Ok(self)
            }
            Err(e) => Err(ConfigError::EnvFileIo {
                path: path.to_path_buf(),
                kind: e.kind(),
            }),
        }
    }

    /// Add an env-file layer read from `path` only when `requirement` matches
    /// the active environment.
    ///
    /// The active environment is read from the process layer configured so
    /// far, so call this after [`Self::mapping`] or [`Self::process_env`].
    /// A skipped file leaves the process layer untouched.
    ///
    /// # Errors
    ///
    /// Same as [`Self::env_file`] when the file is read.
    pub fn env_file_for(
        self,
        path: impl AsRef<Path>,
        requirement: &EnvRequirement,
    ) -> Result<Self, ConfigError> {
        let active = DeploymentEnv::active(&self.process_view());
        if !requirement.matches(active) {
            debug!(
                path = %path.as_ref().display(),
                %active,
                %requirement,
                "env file not used in the active environment"
            );
            return Ok(self);
        }
        self.env_file(path)
    }

    /// Compare keys ASCII case-insensitively in every layer.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    fn process_view(&self) -> ValueSource {
        ValueSource {
            process: self.process.clone().unwrap_or(ProcessLayer::Live),
            files: Vec::new(),
            case_insensitive: self.case_insensitive,
        }
    }

    /// Finish building. Without an explicit process layer, the live environment is used.
    pub fn build(self) -> ValueSource {
        ValueSource {
            process: self.process.unwrap_or(ProcessLayer::Live),
            files: self.files,
            case_insensitive: self.case_insensitive,
        }
    }
}

/// Check if env-file loading is disabled via environment variable.
fn dotenv_disabled() -> bool {
    matches!(
        std::env::var(DOTENV_DISABLED_VAR).ok().as_deref(),
        Some("true") | Some("1")
    )
}
