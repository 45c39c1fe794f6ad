//! # SchemaCache — Load, Validate, Populate, Persist
//!
//! The cache lifecycle within one process is scoped: [`SchemaCache::open`]
//! loads (or silently reinitializes) the on-disk document, all reads and
//! writes during the scope see one consistent in-memory snapshot, and
//! dropping the cache saves it back if anything changed. There is no
//! cross-process locking; concurrent invocations race and the last save
//! wins, which costs a reparse but never corrupts the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use tess_core::pointer::{join_fragment, walk};
use tess_core::value::load_document;

use crate::document::{CacheDocument, CacheEntry, CacheStats, PointerEntry};

/// Cache format version; bumping it invalidates all existing cache files.
pub const CACHE_VERSION: &str = "1.0";

/// Fixed cache filename under the project root.
pub const CACHE_FILENAME: &str = ".tess-schema-cache.json";

/// Error raised by cache operations.
///
/// Corrupted or version-mismatched cache *files* are deliberately not
/// represented here: they are recovered locally by reinitializing the
/// cache, because the cache is an optimization layer whose failure must
/// never block correctness.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The schema file does not exist.
    #[error("schema file not found: {path}")]
    FileNotFound {
        /// Resolved absolute path.
        path: String,
    },

    /// The schema file could not be read or statted.
    #[error("failed to read schema file '{path}': {source}")]
    ReadFailed {
        /// Resolved absolute path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The schema file is not parseable YAML/JSON.
    #[error("failed to load schema from '{path}': {reason}")]
    LoadFailed {
        /// Resolved absolute path.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The requested pointer does not resolve within the document.
    #[error("JSON pointer not found in '{path}': {pointer}")]
    PointerNotFound {
        /// Resolved absolute path.
        path: String,
        /// The normalized pointer that failed to resolve.
        pointer: String,
    },

    /// The cache file could not be persisted.
    #[error("failed to save cache to '{path}': {source}")]
    SaveFailed {
        /// Cache file path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Persistent cache of schema documents and their pointer fragments.
///
/// See the crate docs for the coherence invariants. All paths handed to
/// the cache are resolved against the project root, not the caller's
/// working directory.
#[derive(Debug)]
pub struct SchemaCache {
    project_root: PathBuf,
    cache_file: PathBuf,
    data: CacheDocument,
    dirty: bool,
}

impl SchemaCache {
    /// Open the cache for `project_root`, loading the persisted document
    /// if present.
    ///
    /// A missing, corrupted, or version-mismatched cache file
    /// reinitializes to an empty document and marks the cache dirty so
    /// the bad state is overwritten on the next save. Loading never
    /// fails: cache trouble degrades to an empty cache, not an error.
    pub fn open(project_root: impl AsRef<Path>) -> Self {
        let project_root = project_root.as_ref().to_path_buf();
        let cache_file = project_root.join(CACHE_FILENAME);

        let (data, dirty) = match std::fs::read_to_string(&cache_file) {
            Ok(text) => match serde_json::from_str::<CacheDocument>(&text) {
                Ok(doc) if doc.cache_version == CACHE_VERSION => (doc, false),
                Ok(doc) => {
                    tracing::warn!(
                        cache_file = %cache_file.display(),
                        found = %doc.cache_version,
                        expected = CACHE_VERSION,
                        "cache version mismatch, reinitializing"
                    );
                    (CacheDocument::empty(CACHE_VERSION), true)
                }
                Err(e) => {
                    tracing::warn!(
                        cache_file = %cache_file.display(),
                        error = %e,
                        "corrupted cache file, reinitializing"
                    );
                    (CacheDocument::empty(CACHE_VERSION), true)
                }
            },
            Err(_) => (CacheDocument::empty(CACHE_VERSION), true),
        };

        Self {
            project_root,
            cache_file,
            data,
            dirty,
        }
    }

    /// Persist the cache if anything changed since the last load or save.
    ///
    /// The document is written to a sibling temporary file and renamed
    /// over the target, so a crash mid-write never leaves a partial
    /// cache file behind.
    pub fn save(&mut self) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        self.data.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(&self.data).map_err(|e| {
            CacheError::SaveFailed {
                path: self.cache_file.display().to_string(),
                source: std::io::Error::other(e),
            }
        })?;

        let tmp = self.cache_file.with_file_name(format!("{CACHE_FILENAME}.tmp"));
        let save_err = |source| CacheError::SaveFailed {
            path: self.cache_file.display().to_string(),
            source,
        };
        std::fs::write(&tmp, json).map_err(save_err)?;
        std::fs::rename(&tmp, &self.cache_file).map_err(save_err)?;
        self.dirty = false;
        Ok(())
    }

    /// Save and consume the cache, propagating save errors.
    ///
    /// Dropping the cache saves too, but only best-effort; prefer
    /// `close()` where a save failure must be observable.
    pub fn close(mut self) -> Result<(), CacheError> {
        self.save()
    }

    /// Fetch a schema fragment, from cache when valid, from disk otherwise.
    ///
    /// Cache validity requires all of: an entry for the file's current
    /// content hash, a matching stored path (collision guard), matching
    /// size and mtime (staleness guard), and the requested pointer among
    /// the cached fragments. On a miss the document is parsed once and
    /// sibling fragments are populated preemptively.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist, cannot be parsed, or the
    /// pointer path cannot be traversed.
    pub fn get_schema(
        &mut self,
        file_path: impl AsRef<Path>,
        json_pointer: &str,
    ) -> Result<Value, CacheError> {
        let abs_path = self.resolve_path(file_path.as_ref());
        if !abs_path.exists() {
            return Err(CacheError::FileNotFound {
                path: abs_path.display().to_string(),
            });
        }

        let file_hash = compute_file_hash(&abs_path)?;
        let pointer = normalize_pointer(json_pointer);

        if let Some(fragment) = self.valid_cached_fragment(&file_hash, &abs_path, &pointer) {
            tracing::debug!(path = %abs_path.display(), pointer = %pointer, "cache hit");
            return Ok(fragment);
        }

        tracing::debug!(path = %abs_path.display(), pointer = %pointer, "cache miss");
        self.load_and_cache(&abs_path, file_hash, &pointer)
    }

    /// Remove the entry for the file's current content hash, if present.
    pub fn invalidate_file(&mut self, file_path: impl AsRef<Path>) -> Result<(), CacheError> {
        let abs_path = self.resolve_path(file_path.as_ref());
        if !abs_path.exists() {
            return Err(CacheError::FileNotFound {
                path: abs_path.display().to_string(),
            });
        }
        let file_hash = compute_file_hash(&abs_path)?;
        if self.data.entries.remove(&file_hash).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    /// Reset to an empty cache document and mark the store dirty.
    pub fn clear(&mut self) {
        self.data = CacheDocument::empty(CACHE_VERSION);
        self.dirty = true;
    }

    /// Read-only cache statistics. Never mutates state.
    pub fn stats(&self) -> CacheStats {
        let cached_pointers = self
            .data
            .entries
            .values()
            .map(|entry| entry.pointers.len())
            .sum();
        let cache_size_bytes = std::fs::metadata(&self.cache_file)
            .map(|m| m.len())
            .unwrap_or(0);

        CacheStats {
            cache_file: self.cache_file.display().to_string(),
            cache_size_bytes,
            cached_files: self.data.entries.len(),
            cached_pointers,
            created: self.data.created,
            last_updated: self.data.last_updated,
        }
    }

    /// The project root this cache resolves relative paths against.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn resolve_path(&self, file_path: &Path) -> PathBuf {
        if file_path.is_absolute() {
            file_path.to_path_buf()
        } else {
            self.project_root.join(file_path)
        }
    }

    /// Return the cached fragment iff every validity condition holds.
    fn valid_cached_fragment(
        &self,
        file_hash: &str,
        abs_path: &Path,
        pointer: &str,
    ) -> Option<Value> {
        let entry = self.data.entries.get(file_hash)?;

        // Collision guard: same digest, different path — never reuse.
        if entry.file_path != abs_path.display().to_string() {
            return None;
        }

        // Staleness guard: size and mtime must match what was stored.
        let (size, mtime) = file_signature(abs_path).ok()?;
        if entry.file_size != size || entry.last_modified != mtime {
            return None;
        }

        entry.pointers.get(pointer).map(|p| p.schema.clone())
    }

    fn load_and_cache(
        &mut self,
        abs_path: &Path,
        file_hash: String,
        pointer: &str,
    ) -> Result<Value, CacheError> {
        let document = load_document(abs_path).map_err(|e| CacheError::LoadFailed {
            path: abs_path.display().to_string(),
            reason: e.to_string(),
        })?;
        // Empty documents parse to null; treat them as empty objects so
        // the root pointer still resolves.
        let document = if document.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            document
        };

        let fragment = walk(&document, pointer)
            .cloned()
            .ok_or_else(|| CacheError::PointerNotFound {
                path: abs_path.display().to_string(),
                pointer: pointer.to_string(),
            })?;

        let (file_size, last_modified) = file_signature(abs_path).map_err(|source| {
            CacheError::ReadFailed {
                path: abs_path.display().to_string(),
                source,
            }
        })?;
        let cached_at = Utc::now();

        // Reuse the existing entry only when it is still current for
        // this path; a stale or foreign-path entry is replaced wholesale,
        // because a changed file may have moved content between pointers.
        let file_path = abs_path.display().to_string();
        let mut entry = match self.data.entries.remove(&file_hash) {
            Some(existing)
                if existing.file_path == file_path
                    && existing.file_size == file_size
                    && existing.last_modified == last_modified =>
            {
                existing
            }
            _ => CacheEntry {
                file_path,
                file_size,
                last_modified,
                pointers: BTreeMap::new(),
            },
        };

        populate_common_pointers(&mut entry, &document, cached_at);

        entry
            .pointers
            .entry(pointer.to_string())
            .or_insert_with(|| PointerEntry {
                schema: fragment.clone(),
                cached_at,
            });

        self.data.entries.insert(file_hash, entry);
        self.dirty = true;
        Ok(fragment)
    }
}

impl Drop for SchemaCache {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.save() {
                tracing::warn!(error = %e, "failed to save schema cache on drop");
            }
        }
    }
}

/// Compute the SHA-256 of the file's raw bytes as lowercase hex.
///
/// This digest is the cache key. SHA-256 was chosen deliberately: the
/// key must make accidental collisions between distinct schema files
/// negligible, and the path-match guard covers the contrived remainder.
fn compute_file_hash(path: &Path) -> Result<String, CacheError> {
    let content = std::fs::read(path).map_err(|source| CacheError::ReadFailed {
        path: path.display().to_string(),
        source,
    })?;
    let digest = Sha256::digest(&content);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Current (size, mtime) signature used for staleness detection.
fn file_signature(path: &Path) -> Result<(u64, DateTime<Utc>), std::io::Error> {
    let meta = std::fs::metadata(path)?;
    let mtime = DateTime::<Utc>::from(meta.modified()?);
    Ok((meta.len(), mtime))
}

/// Normalize a pointer to the stored `#/...` spelling (root is `#/`).
fn normalize_pointer(pointer: &str) -> String {
    let frag = pointer.trim_start_matches('#').trim_start_matches('/');
    if frag.is_empty() {
        "#/".to_string()
    } else {
        format!("#/{frag}")
    }
}

/// Preemptively extract every immediate child of the well-known schema
/// containers, plus the containers themselves.
///
/// Best effort: a malformed container is skipped, never aborting the
/// primary load.
fn populate_common_pointers(entry: &mut CacheEntry, document: &Value, cached_at: DateTime<Utc>) {
    for container in ["components/schemas", "definitions", "$defs"] {
        let Some(node) = walk(document, container) else {
            continue;
        };
        let Some(children) = node.as_object() else {
            continue;
        };

        entry.pointers.insert(
            normalize_pointer(container),
            PointerEntry {
                schema: node.clone(),
                cached_at,
            },
        );

        for (name, child) in children {
            if !child.is_object() {
                continue;
            }
            let pointer = normalize_pointer(&join_fragment(container, name));
            entry.pointers.insert(
                pointer,
                PointerEntry {
                    schema: child.clone(),
                    cached_at,
                },
            );
        }
    }
}
