//! # tess-cache — Persistent Schema Cache
//!
//! A content-hash-keyed cache of parsed schema documents and their
//! JSON-Pointer fragments, persisted as a single JSON file under the
//! project root.
//!
//! ## Design
//!
//! - **Keyed by content digest.** Entries are indexed by the SHA-256 of
//!   the schema file's raw bytes, so a rebuilt-but-identical file keeps
//!   its cache entry. A stored-path mismatch for the same digest is
//!   treated as a collision and the entry is reloaded, never reused.
//! - **Staleness invalidates whole entries.** A changed file may have
//!   moved content between pointers, so a size or mtime mismatch
//!   replaces the entire entry rather than patching individual pointers.
//! - **Preemptive population.** Schema documents are accessed
//!   fragment-by-fragment in rapid succession (one validator build per
//!   testspec entry). On a cache miss the document is parsed once and
//!   every immediate child of `components/schemas`, `definitions`, and
//!   `$defs` is stored alongside the requested pointer.
//! - **The cache is an accelerator, never an oracle.** Corrupted or
//!   version-mismatched cache files reinitialize silently; a lost
//!   cross-process update costs a reparse, never correctness.
//!
//! ## Persistence
//!
//! `save()` writes the whole document to a sibling temporary file and
//! renames it into place, so the on-disk cache is always either the
//! previous valid version or the new valid version. Saving is a no-op
//! unless something changed since load. Dropping the cache performs a
//! best-effort save; use [`SchemaCache::close`] to observe save errors.

mod cache;
mod document;

pub use cache::{CacheError, SchemaCache, CACHE_FILENAME, CACHE_VERSION};
pub use document::{CacheDocument, CacheEntry, CacheStats, PointerEntry};
