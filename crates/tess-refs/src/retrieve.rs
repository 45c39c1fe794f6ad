//! # Resource Retrieval — Scheme Dispatch & Bounded Reads
//!
//! Retrieval is modeled over a closed [`UriScheme`] enum rather than
//! string-prefix branching, so the set of supported schemes is
//! exhaustively checked. `file://` is always allowed; `http`/`https`
//! are gated by the caller's [`NetworkPolicy`].
//!
//! ## Resource bound
//!
//! HTTP bodies are consumed through [`read_bounded`]: 8 KiB chunks
//! against a running byte count that aborts the instant it would exceed
//! the policy's cap. A hostile server can therefore force at most
//! `max_bytes + one chunk` into memory, never an unbounded buffer.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use tess_core::value::load_str;

use crate::policy::NetworkPolicy;

const CHUNK_SIZE: usize = 8 * 1024;

/// A URI scheme the retriever knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriScheme {
    /// Local file, always allowed.
    File,
    /// Plain HTTP, policy-gated.
    Http,
    /// HTTPS, policy-gated.
    Https,
}

impl UriScheme {
    /// Split a URI into its scheme and remainder (the part after `://`).
    ///
    /// Any scheme outside the closed set is a caller/configuration
    /// mistake and yields [`UnsupportedSchemeError`], distinct from the
    /// runtime [`NetworkError`] conditions.
    pub fn parse(uri: &str) -> Result<(Self, &str), UnsupportedSchemeError> {
        let (scheme, rest) = uri.split_once("://").ok_or_else(|| UnsupportedSchemeError {
            scheme: String::new(),
            uri: uri.to_string(),
        })?;
        match scheme.to_ascii_lowercase().as_str() {
            "file" => Ok((Self::File, rest)),
            "http" => Ok((Self::Http, rest)),
            "https" => Ok((Self::Https, rest)),
            other => Err(UnsupportedSchemeError {
                scheme: other.to_string(),
                uri: uri.to_string(),
            }),
        }
    }
}

/// The URI uses a scheme outside the supported `{file, http, https}` set.
#[derive(Error, Debug)]
#[error("unsupported URI scheme '{scheme}': {uri}")]
pub struct UnsupportedSchemeError {
    /// The offending scheme (empty when the URI has none).
    pub scheme: String,
    /// The full URI, for diagnostics.
    pub uri: String,
}

/// Runtime retrieval failure.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Network access is denied by the active policy.
    #[error("network fetch disabled by policy: {uri}")]
    Disabled {
        /// The URI that required network access.
        uri: String,
    },

    /// Connection, timeout, or HTTP status failure.
    #[error("failed to fetch '{uri}': {reason}")]
    Fetch {
        /// The URI being fetched.
        uri: String,
        /// Transport diagnostic.
        reason: String,
    },

    /// The response exceeded the policy's byte cap.
    #[error("resource too large (>{max_bytes} bytes): {uri}")]
    TooLarge {
        /// The URI being fetched.
        uri: String,
        /// The cap that was exceeded.
        max_bytes: u64,
    },

    /// The response bytes are not strict UTF-8.
    #[error("response from '{uri}' is not valid UTF-8: {reason}")]
    Decode {
        /// The URI being fetched.
        uri: String,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The resource is not parseable YAML/JSON.
    #[error("resource '{uri}' is not parseable: {reason}")]
    Parse {
        /// The URI being retrieved.
        uri: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A `file://` resource could not be read.
    #[error("failed to read local resource '{uri}': {reason}")]
    LocalRead {
        /// The URI being retrieved.
        uri: String,
        /// IO diagnostic.
        reason: String,
    },
}

/// Error returned by [`retrieve`].
#[derive(Error, Debug)]
pub enum RetrieveError {
    /// Runtime network/file failure.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Configuration mistake: unsupported scheme.
    #[error(transparent)]
    UnsupportedScheme(#[from] UnsupportedSchemeError),
}

/// Fetch and parse a resource by URI under the given policy.
pub fn retrieve(uri: &str, policy: &NetworkPolicy) -> Result<Value, RetrieveError> {
    let (scheme, rest) = UriScheme::parse(uri)?;
    match scheme {
        UriScheme::File => retrieve_file(uri, rest),
        UriScheme::Http | UriScheme::Https => retrieve_http(uri, policy),
    }
}

fn retrieve_file(uri: &str, rest: &str) -> Result<Value, RetrieveError> {
    // file://localhost/x and file:///x both denote the local path /x.
    let path_part = rest.strip_prefix("localhost").unwrap_or(rest);
    let path = PathBuf::from(percent_decode(path_part));
    let text = std::fs::read_to_string(&path).map_err(|e| NetworkError::LocalRead {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    parse_resource(uri, &text)
}

fn retrieve_http(uri: &str, policy: &NetworkPolicy) -> Result<Value, RetrieveError> {
    if !policy.allow_network {
        return Err(NetworkError::Disabled {
            uri: uri.to_string(),
        }
        .into());
    }

    tracing::debug!(uri, timeout_seconds = policy.timeout_seconds, "fetching remote resource");
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(policy.timeout()))
        .build();
    let agent: ureq::Agent = config.into();
    let mut response = agent.get(uri).call().map_err(|e| NetworkError::Fetch {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    let bytes = read_bounded(response.body_mut().as_reader(), policy.max_bytes).map_err(
        |e| match e {
            BoundedReadError::TooLarge => NetworkError::TooLarge {
                uri: uri.to_string(),
                max_bytes: policy.max_bytes,
            },
            BoundedReadError::Io(io) => NetworkError::Fetch {
                uri: uri.to_string(),
                reason: io.to_string(),
            },
        },
    )?;

    let text = String::from_utf8(bytes).map_err(|e| NetworkError::Decode {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    parse_resource(uri, &text)
}

fn parse_resource(uri: &str, text: &str) -> Result<Value, RetrieveError> {
    let value = load_str(text).map_err(|e| NetworkError::Parse {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    // Empty resources parse to null; hand back an empty object so the
    // registry always holds a document.
    Ok(if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    })
}

/// Read at most `max_bytes` from `reader`, in bounded chunks.
///
/// The running count is checked as each chunk lands; the read aborts
/// with `TooLarge` as soon as the budget is exceeded, without draining
/// the rest of the stream.
fn read_bounded<R: Read>(mut reader: R, max_bytes: u64) -> Result<Vec<u8>, BoundedReadError> {
    let mut out: Vec<u8> = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut chunk).map_err(BoundedReadError::Io)?;
        if n == 0 {
            return Ok(out);
        }
        if out.len() as u64 + n as u64 > max_bytes {
            return Err(BoundedReadError::TooLarge);
        }
        out.extend_from_slice(&chunk[..n]);
    }
}

#[derive(Debug)]
enum BoundedReadError {
    TooLarge,
    Io(std::io::Error),
}

/// Render an absolute path as a `file://` URI, percent-encoding the
/// characters that would corrupt URI parsing.
pub fn file_uri(path: &Path) -> String {
    let raw = path.display().to_string();
    let mut encoded = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b' ' | b'#' | b'%' | b'?' => encoded.push_str(&format!("%{b:02X}")),
            _ if b < 0x20 || b >= 0x7f => encoded.push_str(&format!("%{b:02X}")),
            _ => encoded.push(b as char),
        }
    }
    format!("file://{encoded}")
}

/// Decode `%XX` escapes; malformed escapes pass through verbatim.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_scheme_parse_closed_set() {
        assert_eq!(UriScheme::parse("file:///x").unwrap().0, UriScheme::File);
        assert_eq!(UriScheme::parse("http://h/x").unwrap().0, UriScheme::Http);
        assert_eq!(UriScheme::parse("HTTPS://h/x").unwrap().0, UriScheme::Https);

        let err = UriScheme::parse("ftp://h/x").unwrap_err();
        assert_eq!(err.scheme, "ftp");
        let err = UriScheme::parse("just/a/path").unwrap_err();
        assert_eq!(err.scheme, "");
    }

    #[test]
    fn test_read_bounded_fails_incrementally() {
        // 110 bytes against a 100-byte cap: must fail, and must fail
        // without consuming the stream to completion.
        let data = vec![b'x'; 110];
        let err = read_bounded(Cursor::new(data), 100).unwrap_err();
        assert!(matches!(err, BoundedReadError::TooLarge));
    }

    #[test]
    fn test_read_bounded_accepts_exact_budget() {
        let data = vec![b'x'; 100];
        let out = read_bounded(Cursor::new(data), 100).unwrap();
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn test_read_bounded_multi_chunk() {
        let data = vec![b'y'; 3 * CHUNK_SIZE + 17];
        let out = read_bounded(Cursor::new(data), 4 * CHUNK_SIZE as u64).unwrap();
        assert_eq!(out.len(), 3 * CHUNK_SIZE + 17);
    }

    #[test]
    fn test_http_denied_without_network_policy() {
        let policy = NetworkPolicy::default();
        let err = retrieve("http://example.invalid/schema.yaml", &policy).unwrap_err();
        assert!(matches!(
            err,
            RetrieveError::Network(NetworkError::Disabled { .. })
        ));
    }

    #[test]
    fn test_unsupported_scheme_is_distinct_error() {
        let policy = NetworkPolicy::default();
        let err = retrieve("ftp://example.invalid/x", &policy).unwrap_err();
        assert!(matches!(err, RetrieveError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_file_retrieval_ignores_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, "type: object\n").unwrap();

        // Most restrictive possible policy; file access still works.
        let policy = NetworkPolicy::default().update(Some(false), Some(0.001), Some(1));
        let value = retrieve(&file_uri(&path), &policy).unwrap();
        assert_eq!(value["type"], "object");
    }

    #[test]
    fn test_file_uri_roundtrip_with_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my schema.yaml");
        std::fs::write(&path, "a: 1\n").unwrap();

        let uri = file_uri(&path);
        assert!(uri.contains("%20"));
        let value = retrieve(&uri, &NetworkPolicy::default()).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_missing_file_is_local_read_error() {
        let err = retrieve("file:///definitely/not/here.yaml", &NetworkPolicy::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RetrieveError::Network(NetworkError::LocalRead { .. })
        ));
    }

    #[test]
    fn test_empty_resource_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "").unwrap();
        let value = retrieve(&file_uri(&path), &NetworkPolicy::default()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/a%20b/c"), "/a b/c");
        assert_eq!(percent_decode("no-escapes"), "no-escapes");
        assert_eq!(percent_decode("bad%2"), "bad%2");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
