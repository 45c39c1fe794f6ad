//! # Document Loading — YAML/JSON to `serde_json::Value`
//!
//! Schema documents and testspecs are authored as YAML or JSON. This
//! module loads either format and coerces the result to a
//! `serde_json::Value`, which is the lingua franca of the rest of the
//! workspace (the cache stores it, the resolver walks it, the
//! `jsonschema` crate validates against it).
//!
//! YAML is treated as the default text format: JSON is a syntactic
//! subset of YAML, so `load_str` parses everything through `serde_yaml`
//! and only `load_document` branches on the file extension (matching
//! the `.json` fast path used for cache files).

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Error while loading or converting a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("cannot read document '{path}': {source}")]
    Read {
        /// Path to the document that failed to load.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid YAML/JSON.
    #[error("cannot parse document '{path}': {reason}")]
    Parse {
        /// Path (or `<string>` for in-memory text).
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The YAML value has no JSON equivalent (non-scalar map key,
    /// non-finite float).
    #[error("cannot represent document '{path}' as JSON: {reason}")]
    Coerce {
        /// Path (or `<string>` for in-memory text).
        path: String,
        /// What could not be represented.
        reason: String,
    },
}

/// Parse YAML (or JSON) text into a JSON value.
///
/// An empty document yields `Value::Null`.
pub fn load_str(text: &str) -> Result<Value, DocumentError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| DocumentError::Parse {
            path: "<string>".to_string(),
            reason: e.to_string(),
        })?;
    yaml_to_json(&yaml).map_err(|reason| DocumentError::Coerce {
        path: "<string>".to_string(),
        reason,
    })
}

/// Load a document from disk, dispatching on the file extension:
/// `.json` parses as strict JSON, everything else as YAML.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "json" => serde_json::from_str(&content).map_err(|e| DocumentError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
        _ => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|e| DocumentError::Parse {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            yaml_to_json(&yaml).map_err(|reason| DocumentError::Coerce {
                path: path.display().to_string(),
                reason,
            })
        }
    }
}

/// Serialize a JSON value as YAML text.
pub fn dump_yaml(value: &Value) -> Result<String, DocumentError> {
    serde_yaml::to_string(value).map_err(|e| DocumentError::Coerce {
        path: "<string>".to_string(),
        reason: e.to_string(),
    })
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// YAML has a richer type system than JSON (tags, anchors, non-string
/// map keys). Schema documents use only the JSON-compatible subset;
/// numeric and boolean map keys are stringified, tags are stripped.
fn yaml_to_json(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}
