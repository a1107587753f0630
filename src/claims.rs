//! Claim values and the rule verification engine.
//!
//! Claims decoded from a token's JSON payload keep their dynamic shape:
//! a claim value is a [`serde_json::Value`] and a token's claim set is a
//! [`ClaimMap`]. Rules pattern-match on the shape they expect and report a
//! type mismatch for every other shape, so no fixed claim schema is
//! required.

use crate::error::{ClaimFailure, ClaimFailures, Error, Result};
use crate::rules::ClaimRule;
use serde_json::Value;

/// A decoded token's full claim set, keyed by claim name.
pub type ClaimMap = serde_json::Map<String, Value>;

/// Name the dynamic shape of a claim value for type-mismatch messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extraction of a fixed Rust type from a dynamically-shaped claim value.
///
/// Implementations match exactly one JSON shape and yield `None` for every
/// other, which rule constructors turn into a type-mismatch failure naming
/// [`FromClaim::KIND`] against the observed shape.
pub trait FromClaim: Sized {
    /// Shape name used in type-mismatch messages.
    const KIND: &'static str;

    /// Extract `Self` from a claim value, or `None` on shape mismatch.
    fn from_claim(value: &Value) -> Option<Self>;
}

impl FromClaim for String {
    const KIND: &'static str = "string";

    fn from_claim(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromClaim for i64 {
    const KIND: &'static str = "integer";

    fn from_claim(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromClaim for f64 {
    const KIND: &'static str = "number";

    fn from_claim(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromClaim for bool {
    const KIND: &'static str = "boolean";

    fn from_claim(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

/// Evaluate every rule against the claim mapping and aggregate failures.
///
/// Rules are evaluated in list order. A rule whose key is absent records a
/// not-found failure; a rule without a predicate passes vacuously when its
/// key is present; everything else runs the predicate. The call succeeds
/// only when no rule failed, otherwise it returns a single
/// [`Error::ClaimsInvalid`] carrying every failure, so callers see the
/// complete diagnostic in one pass instead of the first failing rule.
pub fn verify(claims: &ClaimMap, rules: &[ClaimRule]) -> Result<()> {
    let mut failures = Vec::new();

    for rule in rules {
        let Some(value) = claims.get(rule.key()) else {
            failures.push(ClaimFailure::NotFound {
                key: rule.key().to_owned(),
            });
            continue;
        };

        if let Err(reason) = rule.check(value) {
            failures.push(ClaimFailure::Invalid {
                key: rule.key().to_owned(),
                reason,
            });
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::ClaimsInvalid(ClaimFailures(failures)))
    }
}
