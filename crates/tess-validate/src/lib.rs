//! # tess-validate — Dual Validators & Divergence Classification
//!
//! The JSON Schema `format` keyword is advisory by default: a compliant
//! validator may enforce it or ignore it. A test case that only passes
//! because the consuming validator ignores `format` is fragile, and a
//! case that is only rejected because of `format` is not "invalid" for
//! every consumer. This crate makes that divergence visible by running
//! every instance through **two** validators built from the same
//! resolution registry:
//!
//! - `strict` — format assertions enabled,
//! - `base` — schema-draft-default behavior, `format` ignored.
//!
//! ## Modules
//!
//! - [`build`] — constructs the validator pair for a
//!   `<file>#<pointer>` reference; cross-document `$ref`s resolve
//!   through one shared retriever bound to the caller's
//!   [`NetworkPolicy`](tess_refs::NetworkPolicy).
//! - [`classify`] — the divergence classifier: instance + expectation
//!   (`valid`/`invalid`) + validator pair → SUCCESS/WARNING/ERROR.
//! - [`suite`] — evaluates a parsed testspec `tests` mapping, including
//!   schema-`examples` auto-cases, optionally accelerated by a
//!   [`SchemaCache`](tess_cache::SchemaCache) (presence of a cache must
//!   never change results, only speed).

pub mod build;
pub mod classify;
pub mod suite;

pub use build::{build_validators, BuildError, ValidatorPair};
pub use classify::{classify, CaseOutcome, CaseStatus, Expectation, GeneratedWarning};
pub use suite::{OutputLevel, SuiteReport, SuiteRunner};
