//! Env-file parsing.
//!
//! Responsibilities:
//! - Turn `.env` text already read into memory into a key/value mapping.
//! - Handle comments, blank lines, single/double quoting and inline comments.
//!
//! Does NOT handle:
//! - Reading files from disk (see `source.rs`).
//! - Variable interpolation or escape sequences.
//!
//! Invariants:
//! - Malformed lines are skipped, never fatal.
//! - Skipped lines are reported by line number only; line content may hold secrets.
//! - Duplicate keys: the last occurrence wins.

use std::collections::HashMap;
use tracing::debug;

/// Key/value pairs produced by parsing one env file.
pub type RawMapping = HashMap<String, String>;

/// Parse result that also records which lines were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEnvFile {
    /// Parsed key/value pairs.
    pub values: RawMapping,
    /// 1-based numbers of lines skipped as malformed.
    pub skipped_lines: Vec<usize>,
}

/// Parse env-file text into a mapping, skipping malformed lines.
pub fn parse_env_file(text: &str) -> RawMapping {
    parse_env_file_report(text).values
}

/// Parse env-file text, keeping track of skipped lines.
pub fn parse_env_file_report(text: &str) -> ParsedEnvFile {
    let mut parsed = ParsedEnvFile::default();

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_line(trimmed) {
            Some((key, value)) => {
                parsed.values.insert(key, value);
            }
            None => {
                debug!(line = idx + 1, "skipping malformed env file line");
                parsed.skipped_lines.push(idx + 1);
            }
        }
    }

    parsed
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line
        .strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(line);
    let (key, rest) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), parse_value(rest)))
}

fn parse_value(raw: &str) -> String {
    let value = raw.trim_start();
    match strip_quotes(value) {
        Some(quoted) => quoted.to_string(),
        None => strip_inline_comment(value).trim().to_string(),
    }
}

/// Returns the text inside a quoted value.
///
/// A value that starts and ends with the same quote keeps everything between
/// the outer pair, inner quotes included. Otherwise the value ends at the
/// first matching close and the rest of the line is discarded. A value whose
/// opening quote is never closed is not considered quoted.
fn strip_quotes(value: &str) -> Option<&str> {
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let trimmed = value.trim_end();
    if trimmed.len() >= 2 && trimmed.ends_with(quote) {
        return Some(&trimmed[1..trimmed.len() - 1]);
    }
    let inner = &value[1..];
    let end = inner.find(quote)?;
    Some(&inner[..end])
}

/// An inline comment starts at a `#` preceded by whitespace.
fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    bytes
        .iter()
        .enumerate()
        .find(|(i, b)| **b == b'#' && (*i == 0 || bytes[i - 1].is_ascii_whitespace()))
        .map(|(i, _)| &value[..i])
        .unwrap_or(value)
}
