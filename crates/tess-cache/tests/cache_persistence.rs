//! Integration tests for the persistent schema cache: transparency,
//! staleness, preemptive population, collision handling, and recovery
//! from bad cache files.

use serde_json::{json, Value};
use tempfile::TempDir;
use tess_cache::{CacheError, SchemaCache, CACHE_FILENAME, CACHE_VERSION};

const OPENAPI_DOC: &str = r#"
openapi: 3.1.0
components:
  schemas:
    User:
      type: object
      properties:
        name:
          type: string
    Address:
      type: object
    Order:
      type: object
"#;

fn write_schema(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn cache_is_transparent_across_cold_and_warm_reads() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);

    let mut cache = SchemaCache::open(dir.path());
    let cold = cache
        .get_schema("schema.yaml", "#/components/schemas/User")
        .unwrap();
    let warm = cache
        .get_schema("schema.yaml", "#/components/schemas/User")
        .unwrap();
    assert_eq!(cold, warm);
    cache.close().unwrap();

    // A fresh process (fresh open) reading the persisted cache must see
    // the same fragment.
    let mut reopened = SchemaCache::open(dir.path());
    let persisted = reopened
        .get_schema("schema.yaml", "#/components/schemas/User")
        .unwrap();
    assert_eq!(cold, persisted);
    assert_eq!(persisted["properties"]["name"]["type"], "string");
}

#[test]
fn relative_paths_resolve_against_project_root() {
    let dir = TempDir::new().unwrap();
    let abs = write_schema(&dir, "schema.yaml", OPENAPI_DOC);

    let mut cache = SchemaCache::open(dir.path());
    let via_rel = cache.get_schema("schema.yaml", "#/").unwrap();
    let via_abs = cache.get_schema(&abs, "#/").unwrap();
    assert_eq!(via_rel, via_abs);
}

#[test]
fn modified_file_is_never_served_stale() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);

    let mut cache = SchemaCache::open(dir.path());
    let before = cache
        .get_schema("schema.yaml", "#/components/schemas/User")
        .unwrap();
    assert_eq!(before["type"], "object");

    write_schema(
        &dir,
        "schema.yaml",
        "components:\n  schemas:\n    User:\n      type: integer\n",
    );
    let after = cache
        .get_schema("schema.yaml", "#/components/schemas/User")
        .unwrap();
    assert_eq!(after["type"], "integer");
}

#[test]
fn one_read_preemptively_populates_sibling_pointers() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);

    let mut cache = SchemaCache::open(dir.path());
    cache
        .get_schema("schema.yaml", "#/components/schemas/User")
        .unwrap();

    let stats = cache.stats();
    assert_eq!(stats.cached_files, 1);
    // User, Address, and Order at minimum, even though only one pointer
    // was requested explicitly.
    assert!(
        stats.cached_pointers >= 3,
        "expected >= 3 cached pointers, got {}",
        stats.cached_pointers
    );
}

#[test]
fn save_is_atomic_and_idempotent() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);
    let cache_file = dir.path().join(CACHE_FILENAME);

    let mut cache = SchemaCache::open(dir.path());
    cache.get_schema("schema.yaml", "#/").unwrap();
    cache.save().unwrap();

    // No temporary residue, and the file on disk is valid JSON with the
    // current format version.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&cache_file).unwrap()).unwrap();
    assert_eq!(on_disk["cache_version"], CACHE_VERSION);

    // A clean save is a no-op: the file bytes do not change.
    let bytes_before = std::fs::read(&cache_file).unwrap();
    cache.save().unwrap();
    assert_eq!(bytes_before, std::fs::read(&cache_file).unwrap());
}

#[test]
fn drop_persists_dirty_state() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);
    {
        let mut cache = SchemaCache::open(dir.path());
        cache.get_schema("schema.yaml", "#/").unwrap();
    }
    assert!(dir.path().join(CACHE_FILENAME).exists());
}

#[test]
fn version_mismatch_reinitializes_silently() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);
    std::fs::write(
        dir.path().join(CACHE_FILENAME),
        json!({
            "cache_version": "0.9",
            "created": "2020-01-01T00:00:00Z",
            "last_updated": "2020-01-01T00:00:00Z",
            "entries": {"deadbeef": {
                "file_path": "/old/schema.yaml",
                "file_size": 1,
                "last_modified": "2020-01-01T00:00:00Z",
                "pointers": {}
            }}
        })
        .to_string(),
    )
    .unwrap();

    let mut cache = SchemaCache::open(dir.path());
    assert_eq!(cache.stats().cached_files, 0);
    // Still fully functional after reinitialization.
    cache.get_schema("schema.yaml", "#/").unwrap();
    cache.save().unwrap();

    let on_disk: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join(CACHE_FILENAME)).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk["cache_version"], CACHE_VERSION);
}

#[test]
fn corrupted_cache_file_reinitializes_silently() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);
    std::fs::write(dir.path().join(CACHE_FILENAME), "{not json").unwrap();

    let mut cache = SchemaCache::open(dir.path());
    assert_eq!(cache.stats().cached_files, 0);
    let user = cache
        .get_schema("schema.yaml", "#/components/schemas/User")
        .unwrap();
    assert_eq!(user["type"], "object");
}

#[test]
fn path_mismatch_for_same_hash_forces_reload() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);
    let cache_file = dir.path().join(CACHE_FILENAME);

    // Populate and persist a legitimate entry, then poison it: keep the
    // hash key but point it at a different path with a sentinel fragment.
    let mut cache = SchemaCache::open(dir.path());
    cache.get_schema("schema.yaml", "#/").unwrap();
    cache.close().unwrap();

    let mut on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&cache_file).unwrap()).unwrap();
    let entries = on_disk["entries"].as_object_mut().unwrap();
    assert_eq!(entries.len(), 1);
    for (_, entry) in entries.iter_mut() {
        entry["file_path"] = json!("/somewhere/else/schema.yaml");
        entry["pointers"]["#/"]["schema"] = json!({"poisoned": true});
    }
    std::fs::write(&cache_file, on_disk.to_string()).unwrap();

    // Same digest, different stored path: the entry must be reloaded
    // from disk, never reused.
    let mut cache = SchemaCache::open(dir.path());
    let root = cache.get_schema("schema.yaml", "#/").unwrap();
    assert!(root.get("poisoned").is_none());
    assert_eq!(root["openapi"], "3.1.0");
}

#[test]
fn missing_file_and_missing_pointer_are_errors() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);

    let mut cache = SchemaCache::open(dir.path());
    let err = cache.get_schema("nope.yaml", "#/").unwrap_err();
    assert!(matches!(err, CacheError::FileNotFound { .. }));

    let err = cache
        .get_schema("schema.yaml", "#/components/schemas/Ghost")
        .unwrap_err();
    assert!(matches!(err, CacheError::PointerNotFound { .. }));
}

#[test]
fn invalidate_and_clear_drop_entries() {
    let dir = TempDir::new().unwrap();
    write_schema(&dir, "schema.yaml", OPENAPI_DOC);

    let mut cache = SchemaCache::open(dir.path());
    cache.get_schema("schema.yaml", "#/").unwrap();
    assert_eq!(cache.stats().cached_files, 1);

    cache.invalidate_file("schema.yaml").unwrap();
    assert_eq!(cache.stats().cached_files, 0);

    cache.get_schema("schema.yaml", "#/").unwrap();
    cache.clear();
    assert_eq!(cache.stats().cached_files, 0);
    assert_eq!(cache.stats().cached_pointers, 0);
}
