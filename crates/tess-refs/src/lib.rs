//! # tess-refs — Reference Resolution & Resource Retrieval
//!
//! Implements the `<file-path>#<json-pointer>` reference expressions
//! consumed from testspec documents, example collection from resolved
//! schema nodes, and the policy-gated retrieval layer that feeds the
//! validator registry.
//!
//! ## Modules
//!
//! - [`resolve`] — `RefExpr` parsing, schema-node resolution, and
//!   `examples` collection with jq-style case identifiers.
//! - [`policy`] — `NetworkPolicy`, an immutable value threaded
//!   explicitly through every retrieval call. There is no process-wide
//!   mutable policy: precedence is explicit override > environment
//!   variable > built-in default.
//! - [`retrieve`] — scheme dispatch over a closed `UriScheme` enum and
//!   bounded streaming reads. An oversized HTTP body fails the instant
//!   the byte budget is exceeded, not after buffering the response.

pub mod policy;
pub mod resolve;
pub mod retrieve;

pub use policy::NetworkPolicy;
pub use resolve::{collect_examples, resolve_schema_node, RefExpr, ResolveError};
pub use retrieve::{
    file_uri, retrieve, NetworkError, RetrieveError, UnsupportedSchemeError, UriScheme,
};
