//! # Network Policy — Explicit, Immutable Retrieval Configuration
//!
//! `NetworkPolicy` is a plain value passed into every retrieval call.
//! There is deliberately no process-wide mutable default: hidden policy
//! state makes the resolver and classifier untestable in isolation, so
//! callers construct a policy once and thread it through explicitly.
//!
//! Precedence when constructing the active policy:
//! explicit [`NetworkPolicy::update`] override > environment variable >
//! built-in default (deny network, 5 s timeout, 5 MiB cap).

use std::time::Duration;

/// Environment variable overriding the fetch timeout, in seconds (float).
pub const ENV_TIMEOUT: &str = "TESS_NETWORK_TIMEOUT";

/// Environment variable overriding the per-resource byte cap (integer).
pub const ENV_MAX_BYTES: &str = "TESS_NETWORK_MAX_BYTES";

/// Built-in fetch timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 5.0;

/// Built-in per-resource byte cap (5 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Immutable network retrieval configuration.
///
/// Network access is denied by default; `file://` retrieval is always
/// allowed regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkPolicy {
    /// Whether `http`/`https` retrieval is permitted at all.
    pub allow_network: bool,
    /// Connection/read timeout in seconds.
    pub timeout_seconds: f64,
    /// Hard cap on the bytes read from a single resource.
    pub max_bytes: u64,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            allow_network: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl NetworkPolicy {
    /// Build a policy from the environment, falling back to the
    /// built-in defaults. Unparsable values are ignored silently — a
    /// typo in an env var must not break resolution, only leave the
    /// default in force.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    fn from_env_with(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut policy = Self::default();
        if let Some(t) = get(ENV_TIMEOUT)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|t| valid_timeout(*t))
        {
            policy.timeout_seconds = t;
        }
        if let Some(m) = get(ENV_MAX_BYTES).and_then(|v| v.trim().parse::<u64>().ok()) {
            policy.max_bytes = m;
        }
        policy
    }

    /// Produce a new policy with the given overrides applied; `None`
    /// keeps the current value, as does a negative or non-finite
    /// timeout. The receiver is unchanged.
    pub fn update(
        self,
        allow_network: Option<bool>,
        timeout_seconds: Option<f64>,
        max_bytes: Option<u64>,
    ) -> Self {
        Self {
            allow_network: allow_network.unwrap_or(self.allow_network),
            timeout_seconds: timeout_seconds
                .filter(|t| valid_timeout(*t))
                .unwrap_or(self.timeout_seconds),
            max_bytes: max_bytes.unwrap_or(self.max_bytes),
        }
    }

    /// The timeout as a `Duration` for the HTTP client.
    ///
    /// Total even for a hand-constructed policy with a hostile
    /// `timeout_seconds`: an unrepresentable value yields the built-in
    /// default instead of panicking mid-fetch.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS as u64))
    }
}

fn valid_timeout(t: f64) -> bool {
    t.is_finite() && t >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_denies_network() {
        let p = NetworkPolicy::default();
        assert!(!p.allow_network);
        assert_eq!(p.timeout_seconds, 5.0);
        assert_eq!(p.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let p = NetworkPolicy::from_env_with(|key| match key {
            ENV_TIMEOUT => Some("2.5".to_string()),
            ENV_MAX_BYTES => Some("1024".to_string()),
            _ => None,
        });
        assert_eq!(p.timeout_seconds, 2.5);
        assert_eq!(p.max_bytes, 1024);
        assert!(!p.allow_network);
    }

    #[test]
    fn test_unparsable_env_falls_back_silently() {
        let p = NetworkPolicy::from_env_with(|key| match key {
            ENV_TIMEOUT => Some("soon".to_string()),
            ENV_MAX_BYTES => Some("-3".to_string()),
            _ => None,
        });
        assert_eq!(p, NetworkPolicy::default());
    }

    #[test]
    fn test_negative_or_nonfinite_env_timeout_is_ignored() {
        for bad in ["-3", "-0.5", "nan", "inf"] {
            let p = NetworkPolicy::from_env_with(|key| match key {
                ENV_TIMEOUT => Some(bad.to_string()),
                _ => None,
            });
            assert_eq!(p, NetworkPolicy::default(), "env timeout {bad:?}");
        }
    }

    #[test]
    fn test_update_rejects_invalid_timeout() {
        let p = NetworkPolicy::default().update(None, Some(-1.0), None);
        assert_eq!(p.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        let p = NetworkPolicy::default().update(None, Some(f64::NAN), None);
        assert_eq!(p.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_timeout_is_total_for_hostile_fields() {
        for bad in [-3.0, f64::NAN, f64::INFINITY] {
            let p = NetworkPolicy {
                timeout_seconds: bad,
                ..NetworkPolicy::default()
            };
            assert_eq!(p.timeout(), Duration::from_secs(5));
        }
    }

    #[test]
    fn test_update_returns_new_instance() {
        let base = NetworkPolicy::default();
        let updated = base.update(Some(true), None, Some(100));
        assert!(updated.allow_network);
        assert_eq!(updated.max_bytes, 100);
        assert_eq!(updated.timeout_seconds, base.timeout_seconds);
        // The original is untouched.
        assert!(!base.allow_network);
        assert_eq!(base.max_bytes, DEFAULT_MAX_BYTES);
    }
}
