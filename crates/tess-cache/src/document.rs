//! # Cache Document — On-Disk Shape
//!
//! Serde types mirroring the persisted cache file. The shape is part of
//! the external interface (diagnostics may inspect it) but the file is
//! not intended for hand-editing: anything that fails to deserialize is
//! discarded and rebuilt.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of the persisted cache file, one per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDocument {
    /// Format version; a mismatch forces full reinitialization.
    pub cache_version: String,
    /// When this cache was first created.
    pub created: DateTime<Utc>,
    /// When the cache was last persisted.
    pub last_updated: DateTime<Utc>,
    /// Entries keyed by the SHA-256 hex digest of the file's raw bytes.
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheDocument {
    /// A fresh, empty cache document stamped with the current time.
    pub fn empty(version: &str) -> Self {
        let now = Utc::now();
        Self {
            cache_version: version.to_string(),
            created: now,
            last_updated: now,
            entries: BTreeMap::new(),
        }
    }
}

/// Cached state for one schema file.
///
/// Created on first successful load; replaced wholesale (never merged)
/// when the file's size or modification time no longer matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Absolute path the digest was computed for. Guards against
    /// cross-path digest collisions: a mismatch invalidates the entry.
    pub file_path: String,
    /// File size in bytes at load time.
    pub file_size: u64,
    /// File modification time at load time.
    pub last_modified: DateTime<Utc>,
    /// Extracted fragments keyed by normalized pointer (`#/...`).
    pub pointers: BTreeMap<String, PointerEntry>,
}

/// One cached JSON-Pointer fragment.
///
/// Never mutated after creation; superseded only when the owning
/// [`CacheEntry`] is replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerEntry {
    /// The extracted schema fragment.
    pub schema: Value,
    /// When the fragment was extracted.
    pub cached_at: DateTime<Utc>,
}

/// Read-only cache introspection, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Path of the persisted cache file.
    pub cache_file: String,
    /// Size of the persisted cache file on disk (0 if not yet saved).
    pub cache_size_bytes: u64,
    /// Number of cached schema files.
    pub cached_files: usize,
    /// Total number of cached pointer fragments across all files.
    pub cached_pointers: usize,
    /// When the cache was first created.
    pub created: DateTime<Utc>,
    /// When the cache was last persisted.
    pub last_updated: DateTime<Utc>,
}
