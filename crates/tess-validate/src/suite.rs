//! # Suite Evaluation — Testspec `tests` Mapping
//!
//! A testspec maps schema references to case groups:
//!
//! ```yaml
//! tests:
//!   schema.yaml#/components/schemas/User:
//!     valid:
//!       '{"name": "alice"}':
//!     invalid:
//!       "42":
//!         description: scalars are not users
//! ```
//!
//! A case's payload defaults to the case key parsed as YAML; an explicit
//! `payload` overrides it, and `parse_payload: true` on a string payload
//! parses the string before validation. Cases marked `from_examples` in
//! the input are skipped and regenerated from the schema's `examples`
//! array, so stale auto-cases never survive a schema change.
//!
//! Severity aggregates across the run: 0 — everything behaved; 1 — at
//! least one case ERROR; 2 — a hard failure (validator build, example
//! collection, or an unparseable case payload). Hard failures are
//! logged per ref and evaluation continues with the remaining refs.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use tess_cache::{CacheError, SchemaCache};
use tess_core::value::load_str;
use tess_refs::resolve::examples_of;
use tess_refs::{collect_examples, NetworkPolicy, RefExpr};

use crate::build::build_validators;
use crate::classify::{classify, CaseOutcome, CaseStatus, Expectation};

/// Which evaluated cases appear in the output mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    /// Every case.
    All,
    /// Warnings and errors.
    Warning,
    /// Errors only.
    Error,
}

impl OutputLevel {
    fn visible(&self, status: CaseStatus) -> bool {
        match self {
            Self::All => true,
            Self::Warning => matches!(status, CaseStatus::Warning | CaseStatus::Error),
            Self::Error => matches!(status, CaseStatus::Error),
        }
    }
}

/// Result of evaluating a `tests` mapping.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    /// Output mapping: ref → `{valid: {..}, invalid: {..}}` with one
    /// output case object per evaluated case that passed the visibility
    /// filter.
    pub tests: Value,
    /// 0 all-success, 1 any case ERROR, 2 any hard failure.
    pub severity: u8,
}

/// Evaluates testspec groups against their schema references.
pub struct SuiteRunner<'a> {
    base_dir: PathBuf,
    policy: NetworkPolicy,
    output_level: OutputLevel,
    include_all: bool,
    cache: Option<&'a mut SchemaCache>,
}

impl<'a> SuiteRunner<'a> {
    /// A runner for testspecs living in `base_dir` (the directory the
    /// reference file parts resolve against).
    pub fn new(base_dir: impl AsRef<Path>, policy: NetworkPolicy) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            policy,
            output_level: OutputLevel::All,
            include_all: false,
            cache: None,
        }
    }

    /// Filter which cases appear in the output.
    pub fn with_output_level(mut self, level: OutputLevel) -> Self {
        self.output_level = level;
        self
    }

    /// Keep every case in the output regardless of the level filter
    /// (used when the output replaces the input file).
    pub fn with_include_all(mut self, include_all: bool) -> Self {
        self.include_all = include_all;
        self
    }

    /// Route schema-node lookups for example collection through a cache.
    /// Results are identical with and without one; only speed differs.
    pub fn with_cache(mut self, cache: &'a mut SchemaCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Evaluate a parsed `tests` mapping.
    pub fn run(&mut self, tests: &Value) -> SuiteReport {
        let mut severity: u8 = 0;
        let mut out_tests = Map::new();

        let Some(groups) = tests.as_object() else {
            return SuiteReport {
                tests: Value::Object(out_tests),
                severity,
            };
        };

        for (schema_ref, group) in groups {
            let pair = match build_validators(&self.base_dir, schema_ref, &self.policy) {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(schema_ref, error = %e, "failed to build validators");
                    severity = severity.max(2);
                    continue;
                }
            };

            let examples = match self.collect_group_examples(schema_ref) {
                Ok(examples) => examples,
                Err(reason) => {
                    tracing::error!(schema_ref, error = %reason, "failed to collect examples");
                    severity = severity.max(2);
                    continue;
                }
            };

            let mut cases_valid = Map::new();
            let mut cases_invalid = Map::new();

            for (case_key, payload) in examples {
                let outcome = classify(&payload, Expectation::Valid, &pair);
                severity = severity.max(case_severity(&outcome));
                let mut out_case = assemble_case(
                    "",
                    Some(&payload),
                    None,
                    false,
                    outcome.status,
                    &outcome,
                    &[],
                );
                out_case.insert("from_examples".to_string(), json!(true));
                if self.include_all || self.output_level.visible(outcome.status) {
                    cases_valid.insert(case_key, Value::Object(out_case));
                }
            }

            for (expectation, bucket) in [
                (Expectation::Valid, &mut cases_valid),
                (Expectation::Invalid, &mut cases_invalid),
            ] {
                let key = match expectation {
                    Expectation::Valid => "valid",
                    Expectation::Invalid => "invalid",
                };
                let Some(cases) = group.get(key).and_then(Value::as_object) else {
                    continue;
                };
                for (case_key, spec) in cases {
                    let case = CaseSpec::from_value(case_key, spec);
                    if case.from_examples {
                        continue;
                    }
                    let prepared = match case.prepare() {
                        Ok(p) => p,
                        Err(reason) => {
                            tracing::error!(
                                schema_ref,
                                case = %case_key,
                                error = %reason,
                                "failed to prepare case payload"
                            );
                            severity = severity.max(2);
                            continue;
                        }
                    };

                    let outcome = classify(&prepared.instance, expectation, &pair);
                    severity = severity.max(case_severity(&outcome));
                    let status = reported_status(&outcome, &case.user_warnings);
                    let out_case = assemble_case(
                        &case.description,
                        prepared.original_payload.as_ref(),
                        prepared.payload_parsed.as_ref(),
                        prepared.emit_parse_flag,
                        status,
                        &outcome,
                        &case.user_warnings,
                    );
                    if self.include_all || self.output_level.visible(status) {
                        bucket.insert(case_key.clone(), Value::Object(out_case));
                    }
                }
            }

            let mut out_group = Map::new();
            if !cases_valid.is_empty() {
                out_group.insert("valid".to_string(), Value::Object(cases_valid));
            }
            if !cases_invalid.is_empty() {
                out_group.insert("invalid".to_string(), Value::Object(cases_invalid));
            }
            if !out_group.is_empty() {
                out_tests.insert(schema_ref.clone(), Value::Object(out_group));
            }
        }

        SuiteReport {
            tests: Value::Object(out_tests),
            severity,
        }
    }

    /// Examples for a ref, through the cache when one is attached.
    ///
    /// The cache raises on a dangling pointer where the direct resolver
    /// yields `None`; both conditions mean "no node, no examples" here.
    fn collect_group_examples(
        &mut self,
        schema_ref: &str,
    ) -> Result<Vec<(String, Value)>, String> {
        match self.cache.as_deref_mut() {
            None => collect_examples(&self.base_dir, schema_ref).map_err(|e| e.to_string()),
            Some(cache) => {
                let r = RefExpr::parse(schema_ref);
                let abs_path = r.schema_path(&self.base_dir);
                match cache.get_schema(&abs_path, &r.fragment) {
                    Ok(node) => Ok(examples_of(Some(&node), &r.fragment)),
                    Err(CacheError::PointerNotFound { .. }) => Ok(Vec::new()),
                    Err(e) => Err(e.to_string()),
                }
            }
        }
    }
}

fn case_severity(outcome: &CaseOutcome) -> u8 {
    match outcome.status {
        CaseStatus::Error => 1,
        _ => 0,
    }
}

/// The status as it appears in the report: a clean SUCCESS carrying
/// user-authored warnings is demoted to WARNING so annotated cases
/// surface under the warning output level.
fn reported_status(outcome: &CaseOutcome, user_warnings: &[String]) -> CaseStatus {
    if outcome.status == CaseStatus::Success && !user_warnings.is_empty() {
        CaseStatus::Warning
    } else {
        outcome.status
    }
}

/// One case as authored in the testspec.
struct CaseSpec {
    key: String,
    description: String,
    payload: Option<Value>,
    parse_payload: bool,
    from_examples: bool,
    user_warnings: Vec<String>,
}

impl CaseSpec {
    fn from_value(key: &str, spec: &Value) -> Self {
        let obj = spec.as_object();
        let get = |name: &str| obj.and_then(|o| o.get(name));

        let user_warnings = get("warnings")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    // Generated entries (objects with a "generated" key)
                    // are dropped and re-derived each run.
                    .filter_map(|w| w.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            key: key.to_string(),
            description: get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            payload: get("payload").cloned(),
            parse_payload: get("parse_payload").and_then(Value::as_bool).unwrap_or(false),
            from_examples: get("from_examples").and_then(Value::as_bool).unwrap_or(false),
            user_warnings,
        }
    }

    /// Derive the instance to validate and what to echo in the output.
    fn prepare(&self) -> Result<PreparedCase, String> {
        match &self.payload {
            // No payload: the case key itself is the YAML-encoded instance.
            None => {
                let instance = load_str(&self.key).map_err(|e| e.to_string())?;
                Ok(PreparedCase {
                    payload_parsed: Some(instance.clone()),
                    instance,
                    original_payload: None,
                    emit_parse_flag: false,
                })
            }
            Some(payload) => match payload.as_str() {
                Some(text) if self.parse_payload => {
                    let instance = load_str(text).map_err(|e| e.to_string())?;
                    Ok(PreparedCase {
                        payload_parsed: Some(instance.clone()),
                        instance,
                        original_payload: Some(payload.clone()),
                        emit_parse_flag: true,
                    })
                }
                _ => Ok(PreparedCase {
                    instance: payload.clone(),
                    original_payload: Some(payload.clone()),
                    payload_parsed: None,
                    emit_parse_flag: false,
                }),
            },
        }
    }
}

struct PreparedCase {
    instance: Value,
    original_payload: Option<Value>,
    payload_parsed: Option<Value>,
    emit_parse_flag: bool,
}

/// Build the output case object in its stable field order.
fn assemble_case(
    description: &str,
    original_payload: Option<&Value>,
    payload_parsed: Option<&Value>,
    emit_parse_flag: bool,
    status: CaseStatus,
    outcome: &CaseOutcome,
    user_warnings: &[String],
) -> Map<String, Value> {
    let mut out = Map::new();
    if !description.is_empty() {
        out.insert("description".to_string(), json!(description));
    }
    if let Some(payload) = original_payload {
        out.insert("payload".to_string(), payload.clone());
    }
    if emit_parse_flag {
        out.insert("parse_payload".to_string(), json!(true));
    }
    out.insert("result".to_string(), json!(status.as_str()));
    if let Some(message) = &outcome.error_message {
        out.insert("message".to_string(), json!(message));
    } else if let Some(message) = &outcome.validation_message {
        out.insert("validation_message".to_string(), json!(message));
    }
    if let Some(parsed) = payload_parsed {
        out.insert("payload_parsed".to_string(), parsed.clone());
    }

    let mut warnings: Vec<Value> = outcome
        .warnings
        .iter()
        .map(|w| json!({"generated": w.message, "code": w.code}))
        .collect();
    warnings.extend(user_warnings.iter().map(|w| json!(w)));
    if !warnings.is_empty() {
        out.insert("warnings".to_string(), Value::Array(warnings));
    }
    out
}
