//! # Divergence Classifier
//!
//! Two expectations (`valid`, `invalid`), three observable outcomes
//! (SUCCESS, WARNING, ERROR). The strict validator runs first; the base
//! validator runs only when strict fails, and the instance counts as
//! observed-valid when either accepts it.
//!
//! A case that reads as SUCCESS under expectation `valid` but owes that
//! success to the base validator ignoring `format` is upgraded to
//! WARNING: per the JSON Schema specification `format` enforcement is
//! optional, so the case is fragile, not wrong. The mirror situation
//! under expectation `invalid` — the base validator accepts something
//! meant to be invalid while only `format` made strict reject it — is a
//! hard ERROR annotated with the formats involved.
//!
//! Classification never fails for well-formed instances; only validator
//! construction can fail, and that is reported upstream as a hard
//! resolution error.

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;

use crate::build::ValidatorPair;

/// Whether a case expects its payload to validate or be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// The payload must be accepted.
    Valid,
    /// The payload must be rejected.
    Invalid,
}

/// Reported status of one evaluated case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    /// Behaved as expected.
    Success,
    /// Behaved as expected, but only because `format` went unenforced.
    Warning,
    /// Did not behave as expected.
    Error,
}

impl CaseStatus {
    /// The status as it appears in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// A warning produced by the classifier (as opposed to one authored by
/// the testspec writer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedWarning {
    /// Stable machine-readable code (`format-divergence`).
    pub code: String,
    /// Human-readable explanation and advice.
    pub message: String,
}

/// Outcome of classifying one instance against one expectation.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    /// SUCCESS, WARNING, or ERROR.
    pub status: CaseStatus,
    /// Set iff the case did not behave as expected.
    pub error_message: Option<String>,
    /// Advisory text that does not affect pass/fail (e.g. why a
    /// correctly-rejected payload was rejected).
    pub validation_message: Option<String>,
    /// Classifier-generated warnings (divergence advisories).
    pub warnings: Vec<GeneratedWarning>,
}

/// Classify an instance against an expectation using the validator pair.
pub fn classify(instance: &Value, expectation: Expectation, pair: &ValidatorPair) -> CaseOutcome {
    let err_strict = first_error(&pair.strict, instance);
    let strict_ok = err_strict.is_none();
    let (base_ok, err_base) = if strict_ok {
        (true, None)
    } else {
        let e = first_error(&pair.base, instance);
        (e.is_none(), e)
    };
    let observed_ok = strict_ok || base_ok;

    match expectation {
        Expectation::Valid => {
            if !observed_ok {
                return CaseOutcome {
                    status: CaseStatus::Error,
                    error_message: err_strict.or(err_base),
                    validation_message: None,
                    warnings: Vec::new(),
                };
            }
            // Success — but flag it when it hinges on unenforced formats.
            let mut outcome = CaseOutcome {
                status: CaseStatus::Success,
                error_message: None,
                validation_message: None,
                warnings: Vec::new(),
            };
            if !strict_ok && base_ok {
                // The two validators differ only in format assertions,
                // so a strict-only rejection is format divergence even
                // when an applicator (anyOf, oneOf) wraps the failing
                // assertion and no Format error kind surfaces.
                let formats = collect_format_failures(&pair.strict, instance);
                outcome.warnings.push(divergence_warning(&formats));
                outcome.status = CaseStatus::Warning;
            }
            outcome
        }
        Expectation::Invalid => {
            if !observed_ok {
                // Correctly rejected by both; carry the rejection reason
                // as advisory text.
                return CaseOutcome {
                    status: CaseStatus::Success,
                    error_message: None,
                    validation_message: err_strict.or(err_base),
                    warnings: Vec::new(),
                };
            }
            let error_message = if !strict_ok && base_ok {
                let formats = collect_format_failures(&pair.strict, instance);
                unexpectedly_valid_divergent(&formats)
            } else {
                "UNEXPECTEDLY VALID".to_string()
            };
            CaseOutcome {
                status: CaseStatus::Error,
                error_message: Some(error_message),
                validation_message: None,
                warnings: Vec::new(),
            }
        }
    }
}

fn first_error(validator: &Validator, instance: &Value) -> Option<String> {
    validator.iter_errors(instance).next().map(|e| e.to_string())
}

/// The `format` values behind the strict validator's failures, sorted
/// and deduplicated. May be empty when the failing assertion is wrapped
/// in an applicator and only the applicator's error kind surfaces.
fn collect_format_failures(strict: &Validator, instance: &Value) -> Vec<String> {
    let mut formats: Vec<String> = strict
        .iter_errors(instance)
        .filter_map(|e| match e.kind {
            ValidationErrorKind::Format { format } => Some(format),
            _ => None,
        })
        .collect();
    formats.sort();
    formats.dedup();
    formats
}

fn pattern_advice() -> &'static str {
    "Consider enforcing the expected format by adding an explicit 'pattern' property to the schema."
}

fn formats_suffix(formats: &[String]) -> String {
    if formats.is_empty() {
        String::new()
    } else {
        format!(" (format: {})", formats.join(", "))
    }
}

fn divergence_warning(formats: &[String]) -> GeneratedWarning {
    let message = format!(
        "Relies on JSON Schema 'format' assertion{}.\n\
         Validators that *enforce* 'format' will reject this instance.\n\
         {}\n",
        formats_suffix(formats),
        pattern_advice(),
    );
    GeneratedWarning {
        code: "format-divergence".to_string(),
        message,
    }
}

fn unexpectedly_valid_divergent(formats: &[String]) -> String {
    format!(
        "UNEXPECTEDLY VALID\n\
         A validator that *ignores* 'format' accepted this instance, while a strict validator \
         (enforcing 'format') might reject it as desired{}.\n\
         {}\n",
        formats_suffix(formats),
        pattern_advice(),
    )
}
