//! Claim rules and their constructors.
//!
//! A [`ClaimRule`] pairs a claim key with a predicate over the claim's
//! decoded value. Rules are built once, hold no mutable state, and may be
//! shared across any number of concurrent verification calls. The engine
//! in [`crate::claims::verify`] owns the absent-key case; a predicate only
//! ever receives a value that is present and must classify it.
//!
//! Predicates signal two families of failure: a *type mismatch* when the
//! claim value's dynamic shape is not the one the rule expects, and a
//! *value mismatch* when the shape is right but the content is wrong.
//! Timestamp rules are additionally parameterized by an injected
//! now-provider, so their outcome is a pure function of the claim value
//! and the supplied current time.

use crate::claims::{kind, FromClaim};
use crate::error::ClaimError;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Predicate over a present claim value.
pub type Rule = Arc<dyn Fn(&Value) -> std::result::Result<(), ClaimError> + Send + Sync>;

/// Provider of the current Unix timestamp (whole seconds, UTC).
///
/// Injected into timestamp rules at construction time instead of reading
/// the ambient clock inside the predicate, which keeps time comparisons
/// deterministic under test.
pub type NowProvider = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Direction of a timestamp window check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampCheck {
    /// The claim must not lie more than `leeway` seconds in the past.
    Expiration,
    /// The claim must not lie more than `leeway` seconds in the future.
    IssuedAt,
}

/// How numeric timestamp claims are decoded.
///
/// Mirrors the two ways a token parser may be configured to decode JSON
/// numbers; the rule must use whichever mode matches that configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericMode {
    /// Timestamps must be integer-shaped JSON numbers.
    FixedPrecision,
    /// Timestamps may be any JSON number, decoded as a 64-bit float and
    /// truncated to whole seconds.
    #[default]
    FloatingPoint,
}

/// A claim key plus the predicate validating its value.
#[derive(Clone)]
pub struct ClaimRule {
    key: String,
    rule: Option<Rule>,
}

impl ClaimRule {
    /// Build a rule with a custom predicate.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty.
    pub fn new<F>(key: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), ClaimError> + Send + Sync + 'static,
    {
        Self::build(key.into(), Some(Arc::new(rule)))
    }

    /// Build a rule that only requires the claim to be present.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty.
    pub fn present(key: impl Into<String>) -> Self {
        Self::build(key.into(), None)
    }

    fn build(key: String, rule: Option<Rule>) -> Self {
        assert!(!key.is_empty(), "claim rule key must not be empty");
        Self { key, rule }
    }

    /// The claim key this rule applies to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run the predicate against a present claim value.
    ///
    /// Rules without a predicate pass vacuously.
    pub(crate) fn check(&self, value: &Value) -> std::result::Result<(), ClaimError> {
        match &self.rule {
            Some(rule) => rule(value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ClaimRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimRule")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Rule requiring the claim to equal `want` exactly.
///
/// The claim value must extract as `T` (type mismatch otherwise) and
/// compare equal under strict equality, with no coercion between shapes.
pub fn exact_match<T>(key: impl Into<String>, want: T) -> ClaimRule
where
    T: FromClaim + PartialEq + fmt::Display + Send + Sync + 'static,
{
    ClaimRule::new(key, move |value| {
        let got = T::from_claim(value).ok_or(ClaimError::TypeMismatch {
            expected: T::KIND,
            actual: kind(value),
        })?;

        if got != want {
            return Err(ClaimError::ValueMismatch {
                expected: want.to_string(),
                actual: got.to_string(),
            });
        }

        Ok(())
    })
}

/// Rule requiring the `aud` claim to equal `want`.
pub fn audience(want: impl Into<String>) -> ClaimRule {
    exact_match("aud", want.into())
}

/// Rule requiring the `cid` claim to equal `want`.
pub fn client_id(want: impl Into<String>) -> ClaimRule {
    exact_match("cid", want.into())
}

/// Rule requiring an array claim to contain every value in `wanted`.
///
/// The claim must be an array whose every element extracts as `T`; the
/// first element that does not is a type mismatch. Observed values are
/// collected into a set, and the rule fails iff any wanted value is
/// absent. The failure message lists each missing value exactly once, in
/// the order it appears in `wanted`, so callers debugging entitlement
/// checks see the complete gap in a stable order. An empty `wanted` set
/// always passes.
pub fn contains_all<T>(key: impl Into<String>, wanted: impl IntoIterator<Item = T>) -> ClaimRule
where
    T: FromClaim + Eq + Hash + fmt::Display + Send + Sync + 'static,
{
    let wanted: Vec<T> = wanted.into_iter().collect();

    ClaimRule::new(key, move |value| {
        let Value::Array(elements) = value else {
            return Err(ClaimError::TypeMismatch {
                expected: "array",
                actual: kind(value),
            });
        };

        let mut observed = HashSet::with_capacity(elements.len());
        for element in elements {
            let Some(item) = T::from_claim(element) else {
                return Err(ClaimError::ElementTypeMismatch {
                    expected: T::KIND,
                    actual: kind(element),
                });
            };
            observed.insert(item);
        }

        // Missing values follow the wanted list's order, never the set's
        // iteration order, so the message is reproducible across runs.
        let mut missing: Vec<String> = Vec::new();
        for want in &wanted {
            if !observed.contains(want) {
                let formatted = want.to_string();
                if !missing.contains(&formatted) {
                    missing.push(formatted);
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClaimError::MissingValues(missing))
        }
    })
}

/// Rule checking a numeric timestamp claim against a leeway window.
///
/// The claim decodes per `mode` to whole seconds since the Unix epoch
/// (sub-second precision is not preserved). With
/// [`TimestampCheck::Expiration`] the rule fails once `now - ts` exceeds
/// `leeway_seconds`; with [`TimestampCheck::IssuedAt`] it fails once
/// `ts - now` does. Both comparisons are strict, so a difference exactly
/// equal to the leeway passes, and a leeway of zero means no tolerance.
pub fn timestamp_window(
    key: impl Into<String>,
    leeway_seconds: u64,
    check: TimestampCheck,
    mode: NumericMode,
    now: NowProvider,
) -> ClaimRule {
    ClaimRule::new(key, move |value| {
        let ts = decode_timestamp(value, mode)?;
        let now = now();
        let leeway = i64::try_from(leeway_seconds).unwrap_or(i64::MAX);

        match check {
            TimestampCheck::Expiration if now.saturating_sub(ts) > leeway => {
                Err(ClaimError::Expired)
            }
            TimestampCheck::IssuedAt if ts.saturating_sub(now) > leeway => {
                Err(ClaimError::IssuedInFuture)
            }
            _ => Ok(()),
        }
    })
}

fn decode_timestamp(value: &Value, mode: NumericMode) -> std::result::Result<i64, ClaimError> {
    match mode {
        NumericMode::FixedPrecision => value.as_i64().ok_or(ClaimError::TypeMismatch {
            expected: "integer",
            actual: kind(value),
        }),
        NumericMode::FloatingPoint => {
            value
                .as_f64()
                .map(|ts| ts as i64)
                .ok_or(ClaimError::TypeMismatch {
                    expected: "number",
                    actual: kind(value),
                })
        }
    }
}

/// Current Unix timestamp, used by the default now-provider.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_NOW: i64 = 1_700_000_000;

    fn fixed_now() -> NowProvider {
        Arc::new(|| TEST_NOW)
    }

    fn expiration(leeway: u64, mode: NumericMode) -> ClaimRule {
        timestamp_window("exp", leeway, TimestampCheck::Expiration, mode, fixed_now())
    }

    fn issued_at(leeway: u64, mode: NumericMode) -> ClaimRule {
        timestamp_window("iat", leeway, TimestampCheck::IssuedAt, mode, fixed_now())
    }

    #[test]
    fn exact_match_passes_on_equal_value() {
        let rule = exact_match("foo", "bar".to_string());
        assert_eq!(rule.key(), "foo");
        assert!(rule.check(&json!("bar")).is_ok());
    }

    #[test]
    fn exact_match_reports_value_mismatch() {
        let rule = exact_match("foo", "hello".to_string());
        let err = rule.check(&json!("bar")).unwrap_err();
        assert_eq!(err.to_string(), "expected 'hello' but got 'bar'");
    }

    #[test]
    fn exact_match_reports_type_mismatch() {
        let rule = exact_match("foo", "hello".to_string());
        let err = rule.check(&json!(["bar"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a value of type string but got a value of type array"
        );
    }

    #[test]
    fn exact_match_works_for_integers() {
        let rule = exact_match("count", 42i64);
        assert!(rule.check(&json!(42)).is_ok());

        let err = rule.check(&json!(41)).unwrap_err();
        assert_eq!(err.to_string(), "expected '42' but got '41'");

        let err = rule.check(&json!(42.5)).unwrap_err();
        assert!(matches!(err, ClaimError::TypeMismatch { .. }));
    }

    #[test]
    fn audience_and_client_id_bind_their_keys() {
        assert_eq!(audience("x").key(), "aud");
        assert_eq!(client_id("x").key(), "cid");
    }

    #[test]
    fn contains_all_requires_an_array() {
        let rule = contains_all("foo", ["bar".to_string()]);
        let err = rule.check(&json!("bar")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a value of type array but got a value of type string"
        );
    }

    #[test]
    fn contains_all_rejects_mistyped_elements() {
        let rule = contains_all("foo", ["bar".to_string()]);
        let err = rule.check(&json!(["bar", 7])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "array element is not of type string (found number)"
        );
    }

    #[test]
    fn contains_all_reports_every_missing_value_once() {
        let rule = contains_all("foo", ["a".to_string(), "d".to_string()]);
        let err = rule.check(&json!(["a", "b", "c"])).unwrap_err();
        assert_eq!(err.to_string(), "missing value(s): 'd'");

        let rule = contains_all(
            "foo",
            ["x".to_string(), "a".to_string(), "y".to_string()],
        );
        let err = rule.check(&json!(["a", "b"])).unwrap_err();
        assert_eq!(err.to_string(), "missing value(s): 'x', 'y'");

        // Duplicates in the wanted list collapse to one report.
        let rule = contains_all("foo", ["d".to_string(), "d".to_string()]);
        let err = rule.check(&json!(["a"])).unwrap_err();
        assert_eq!(err.to_string(), "missing value(s): 'd'");
    }

    #[test]
    fn contains_all_passes_when_subset_present() {
        let rule = contains_all("foo", ["a".to_string(), "b".to_string()]);
        assert!(rule.check(&json!(["a", "b", "c"])).is_ok());
    }

    #[test]
    fn contains_all_with_empty_wanted_set_passes() {
        let rule = contains_all("foo", Vec::<String>::new());
        assert!(rule.check(&json!(["anything"])).is_ok());
        assert!(rule.check(&json!([])).is_ok());
    }

    #[test]
    fn expiration_rejects_non_numbers() {
        let rule = expiration(0, NumericMode::FloatingPoint);
        assert_eq!(rule.key(), "exp");

        let err = rule.check(&json!("foobar")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a value of type number but got a value of type string"
        );
    }

    #[test]
    fn expiration_without_leeway_fails_past_timestamps() {
        let rule = expiration(0, NumericMode::FloatingPoint);
        let err = rule.check(&json!((TEST_NOW - 30) as f64)).unwrap_err();
        assert_eq!(err.to_string(), "token is expired");
    }

    #[test]
    fn expiration_with_leeway_tolerates_recent_timestamps() {
        let rule = expiration(60, NumericMode::FloatingPoint);
        assert!(rule.check(&json!((TEST_NOW - 30) as f64)).is_ok());

        let err = rule.check(&json!((TEST_NOW - 90) as f64)).unwrap_err();
        assert_eq!(err.to_string(), "token is expired");
    }

    #[test]
    fn expiration_boundary_is_exclusive() {
        // A difference exactly equal to the leeway still passes.
        let rule = expiration(60, NumericMode::FloatingPoint);
        assert!(rule.check(&json!((TEST_NOW - 60) as f64)).is_ok());

        let err = rule.check(&json!((TEST_NOW - 61) as f64)).unwrap_err();
        assert_eq!(err.to_string(), "token is expired");
    }

    #[test]
    fn expiration_passes_future_timestamps() {
        let rule = expiration(0, NumericMode::FloatingPoint);
        assert!(rule.check(&json!((TEST_NOW + 30) as f64)).is_ok());
    }

    #[test]
    fn issued_at_without_leeway_fails_future_timestamps() {
        let rule = issued_at(0, NumericMode::FloatingPoint);
        assert_eq!(rule.key(), "iat");

        let err = rule.check(&json!((TEST_NOW + 30) as f64)).unwrap_err();
        assert_eq!(err.to_string(), "token was issued in the future");
    }

    #[test]
    fn issued_at_with_leeway_tolerates_near_future() {
        let rule = issued_at(60, NumericMode::FloatingPoint);
        assert!(rule.check(&json!((TEST_NOW + 30) as f64)).is_ok());

        let err = rule.check(&json!((TEST_NOW + 90) as f64)).unwrap_err();
        assert_eq!(err.to_string(), "token was issued in the future");
    }

    #[test]
    fn issued_at_passes_current_timestamp() {
        let rule = issued_at(0, NumericMode::FloatingPoint);
        assert!(rule.check(&json!(TEST_NOW as f64)).is_ok());
    }

    #[test]
    fn fixed_precision_requires_integer_shape() {
        let rule = expiration(60, NumericMode::FixedPrecision);
        assert!(rule.check(&json!(TEST_NOW)).is_ok());

        let err = rule.check(&json!(TEST_NOW as f64 + 0.5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a value of type integer but got a value of type number"
        );

        let err = rule.check(&json!("1700000000")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a value of type integer but got a value of type string"
        );
    }

    #[test]
    fn floating_point_truncates_to_whole_seconds() {
        let rule = expiration(60, NumericMode::FloatingPoint);
        assert!(rule.check(&json!(TEST_NOW)).is_ok());
        // 0.9s shy of the boundary truncates onto it and passes.
        assert!(rule.check(&json!((TEST_NOW - 60) as f64 + 0.9)).is_ok());
    }

    #[test]
    #[should_panic(expected = "claim rule key must not be empty")]
    fn empty_rule_key_panics() {
        let _ = ClaimRule::present("");
    }
}
