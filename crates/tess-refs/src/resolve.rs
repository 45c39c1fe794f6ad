//! # Reference Expressions — `<file>#<pointer>`
//!
//! A reference expression names a schema file (relative to the testspec
//! directory) and an optional JSON-Pointer fragment, split on the first
//! `#`. Resolution walks the parsed document; a missing segment yields
//! `None` rather than an error, because an absent node is an ordinary
//! condition for example collection (the cache layer, by contrast,
//! treats a dangling pointer as a hard error — see its docs).

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use tess_core::pointer::{split_pointer, walk};
use tess_core::value::{load_document, DocumentError};

/// Error while resolving a reference expression.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The referenced schema file could not be loaded or parsed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A parsed `<file-path>#<json-pointer>` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefExpr {
    /// File part, relative to the base directory.
    pub file: String,
    /// Pointer fragment with the leading `/` stripped; empty means the
    /// document root.
    pub fragment: String,
}

impl RefExpr {
    /// Split a reference expression on the first `#`.
    ///
    /// The pointer is optional and defaults to the document root.
    pub fn parse(ref_expr: &str) -> Self {
        match ref_expr.split_once('#') {
            Some((file, frag)) => Self {
                file: file.to_string(),
                fragment: frag.trim_start_matches('/').to_string(),
            },
            None => Self {
                file: ref_expr.to_string(),
                fragment: String::new(),
            },
        }
    }

    /// Absolute path of the referenced file under `base_dir`.
    pub fn schema_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.file)
    }
}

/// Resolve a reference expression to a schema node.
///
/// Returns the resolved node (or `None` if any pointer segment is
/// missing or a traversed node is not an object) together with the
/// stripped fragment. File read or parse failures are errors; a
/// dangling pointer is not — callers must check for `None`.
pub fn resolve_schema_node(
    base_dir: &Path,
    ref_expr: &str,
) -> Result<(Option<Value>, String), ResolveError> {
    let r = RefExpr::parse(ref_expr);
    let doc = load_document(&r.schema_path(base_dir))?;
    // Empty documents parse to null; resolve them as empty objects so
    // the root fragment is still a node.
    let doc = if doc.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        doc
    };
    let node = walk(&doc, &r.fragment).cloned();
    Ok((node, r.fragment))
}

/// Collect the `examples` array of the resolved node.
///
/// Returns one `(identifier, value)` pair per array element, where the
/// identifier is a jq-style path back to the example's position (used
/// for human-readable case naming only). Empty when the node is absent,
/// not an object, or has no `examples` array — never an error beyond
/// file load failures.
pub fn collect_examples(
    base_dir: &Path,
    ref_expr: &str,
) -> Result<Vec<(String, Value)>, ResolveError> {
    let (node, fragment) = resolve_schema_node(base_dir, ref_expr)?;
    Ok(examples_of(node.as_ref(), &fragment))
}

/// Example extraction over an already-resolved node; shared by the
/// direct and cache-accelerated paths.
pub fn examples_of(node: Option<&Value>, fragment: &str) -> Vec<(String, Value)> {
    let Some(examples) = node
        .and_then(Value::as_object)
        .and_then(|o| o.get("examples"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let prefix = jq_examples_prefix(fragment);
    let base = format!("{prefix}.examples");
    examples
        .iter()
        .enumerate()
        .map(|(i, item)| (format!("{base}[{i}]"), item.clone()))
        .collect()
}

/// Render one pointer segment as a jq path component, quoting segments
/// that are not plain identifiers.
fn jq_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!(".{segment}")
    } else {
        format!(".[\"{segment}\"]")
    }
}

fn jq_examples_prefix(fragment: &str) -> String {
    split_pointer(fragment)
        .iter()
        .map(|s| jq_segment(s))
        .collect()
}
