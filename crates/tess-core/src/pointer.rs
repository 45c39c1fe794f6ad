//! # JSON Pointers — RFC 6901 Traversal
//!
//! Pointer fragments arrive in two spellings: `#/components/schemas/User`
//! (from reference expressions) and `/components/schemas/User` (bare).
//! All functions here accept either; leading `#` and `/` are stripped
//! before splitting.
//!
//! Escaping order matters when unescaping: `~1` → `/` first, then
//! `~0` → `~`, so that `~01` decodes to `~1` and not `/`.

use serde_json::Value;

/// Split a pointer fragment into unescaped segments.
///
/// The root pointer (``, `/`, `#`, `#/`) yields an empty vector.
pub fn split_pointer(fragment: &str) -> Vec<String> {
    let frag = fragment.trim_start_matches('#').trim_start_matches('/');
    if frag.is_empty() {
        return Vec::new();
    }
    frag.split('/')
        .map(|p| p.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Walk a document along a pointer fragment.
///
/// Returns `None` as soon as a segment is missing or the current node is
/// not an object. Array indexing is intentionally unsupported: schema
/// fragments are addressed by object keys (`components/schemas/...`,
/// `definitions/...`, `$defs/...`).
pub fn walk<'a>(document: &'a Value, fragment: &str) -> Option<&'a Value> {
    let mut node = document;
    for segment in split_pointer(fragment) {
        node = node.as_object()?.get(&segment)?;
    }
    Some(node)
}

/// Join a parent fragment and a child key into one fragment.
///
/// An empty parent yields the bare child, so generated refs never carry
/// a doubled slash.
pub fn join_fragment(parent_fragment: &str, child: &str) -> String {
    let parent = parent_fragment.trim_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}
