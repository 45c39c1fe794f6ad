//! # Validator Construction — One Registry, Two Enforcement Levels
//!
//! The target reference is wrapped as `{"$ref": "<file-uri>#/<frag>"}`
//! and both validators are compiled against that wrapper, so
//! cross-document `$ref`s inside the schema resolve through the shared
//! retriever instead of being re-parsed per validator. The root
//! document is loaded exactly once and served from memory; every other
//! URI goes through [`tess_refs::retrieve`] under the caller's policy.

use std::path::Path;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::{json, Value};
use thiserror::Error;

use tess_core::value::load_document;
use tess_refs::{file_uri, NetworkPolicy, RefExpr};

/// Error while constructing the validator pair.
///
/// Surfaced as a hard failure, never a per-case result: a malformed
/// schema or unresolvable `$ref` poisons every case under the ref.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The referenced schema file could not be loaded.
    #[error("failed to load schema for ref '{ref_expr}' (base dir: {base_dir}): {reason}")]
    SchemaLoad {
        /// The reference expression being built.
        ref_expr: String,
        /// Directory the file part was resolved against.
        base_dir: String,
        /// Load/parse diagnostic.
        reason: String,
    },

    /// The validator could not be compiled (malformed schema or
    /// unresolvable `$ref`).
    #[error("failed to build validator for ref '{ref_expr}': {reason}")]
    ValidatorBuild {
        /// The reference expression being built.
        ref_expr: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

/// The two validators for one schema reference.
#[derive(Debug)]
pub struct ValidatorPair {
    /// Format assertions enforced.
    pub strict: Validator,
    /// Schema-draft-default behavior: `format` is advisory only.
    pub base: Validator,
}

/// Resolves registry lookups for one root document under a fixed policy.
///
/// The root document is answered from memory; anything else is fetched
/// through the retrieval layer, which keeps network access behind the
/// policy gate even for `$ref`s discovered deep inside a schema.
struct PolicyRetriever {
    root_uri: String,
    root_doc: Value,
    policy: NetworkPolicy,
}

impl Retrieve for PolicyRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        let without_fragment = uri_str.split('#').next().unwrap_or(uri_str);
        if without_fragment == self.root_uri {
            return Ok(self.root_doc.clone());
        }
        Ok(tess_refs::retrieve(without_fragment, &self.policy)?)
    }
}

/// Build the (strict, base) validator pair for a reference expression.
///
/// Both validators share the same resolution behavior and target the
/// same resolved reference; they differ only in format enforcement.
pub fn build_validators(
    base_dir: &Path,
    ref_expr: &str,
    policy: &NetworkPolicy,
) -> Result<ValidatorPair, BuildError> {
    let r = RefExpr::parse(ref_expr);
    let schema_path = r.schema_path(base_dir);
    // Canonicalize so the registry URI is stable regardless of how the
    // base dir was spelled; fall back to the joined path for the error.
    let schema_path = schema_path.canonicalize().map_err(|e| BuildError::SchemaLoad {
        ref_expr: ref_expr.to_string(),
        base_dir: base_dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let root_doc = load_document(&schema_path).map_err(|e| BuildError::SchemaLoad {
        ref_expr: ref_expr.to_string(),
        base_dir: base_dir.display().to_string(),
        reason: e.to_string(),
    })?;
    let root_doc = if root_doc.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        root_doc
    };

    let base_uri = file_uri(&schema_path);
    let target = if r.fragment.is_empty() {
        base_uri.clone()
    } else {
        format!("{base_uri}#/{}", r.fragment)
    };
    let wrapper = json!({ "$ref": target });

    let build_one = |formats: bool| -> Result<Validator, BuildError> {
        let retriever = PolicyRetriever {
            root_uri: base_uri.clone(),
            root_doc: root_doc.clone(),
            policy: *policy,
        };
        let mut options = jsonschema::options();
        options
            .with_draft(Draft::Draft202012)
            .with_retriever(retriever);
        if formats {
            options.should_validate_formats(true);
        }
        options.build(&wrapper).map_err(|e| BuildError::ValidatorBuild {
            ref_expr: ref_expr.to_string(),
            reason: e.to_string(),
        })
    };

    Ok(ValidatorPair {
        strict: build_one(true)?,
        base: build_one(false)?,
    })
}
