//! # tess-core — Foundational Primitives
//!
//! Leaf crate of the tess workspace. Everything else depends on
//! `tess-core`; it depends on nothing internal.
//!
//! Two concerns live here:
//!
//! 1. **Document loading** (`value`): schema files are YAML or JSON on
//!    disk, but every downstream consumer (the cache, the resolver, the
//!    `jsonschema` validators) works on `serde_json::Value`. The `value`
//!    module owns the YAML→JSON coercion so it happens in exactly one
//!    place.
//!
//! 2. **JSON Pointers** (`pointer`): RFC 6901 segment splitting and
//!    unescaping, document walking, and fragment joining. Both the cache
//!    and the reference resolver traverse pointers; they must agree on
//!    the escaping rules.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tess-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod pointer;
pub mod value;

pub use pointer::{join_fragment, split_pointer, walk};
pub use value::{dump_yaml, load_document, load_str, DocumentError};
