//! Field resolution.
//!
//! Responsibilities:
//! - `OptionalResolver`: resolve a schema against a value source, assigning
//!   `Missing` to absent optional fields.
//! - `EnvGatedResolver`: resolve only when the declared environment
//!   requirement matches the active environment, else return all-`Missing`.
//!
//! Does NOT handle:
//! - Building value sources (see `source.rs`) or determining the active
//!   environment (see `environment.rs`); both are passed in.
//!
//! Invariants:
//! - Resolution is all-or-nothing: an instance is returned only when every
//!   eager field resolved; otherwise the first error is returned.
//! - The gated resolver delegates to the optional resolver; it never
//!   resolves fields itself.

mod gated;
mod optional;

pub use gated::EnvGatedResolver;
pub use optional::OptionalResolver;
