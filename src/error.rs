//! Errors for oidc-verify

use std::fmt;
use thiserror::Error;

/// Failure produced by a single claim rule's predicate.
///
/// Predicates only ever see claim values that are present in the mapping;
/// the absent-key case is recorded by the verification engine as
/// [`ClaimFailure::NotFound`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    /// The claim value's dynamic shape does not match what the rule expects.
    #[error("expected a value of type {expected} but got a value of type {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// An array claim contains an element of the wrong shape.
    #[error("array element is not of type {expected} (found {actual})")]
    ElementTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The claim value has the right shape but the wrong content.
    #[error("expected '{expected}' but got '{actual}'")]
    ValueMismatch { expected: String, actual: String },

    /// Required values absent from an array claim, in wanted-list order.
    #[error("missing value(s): {}", quoted_list(.0))]
    MissingValues(Vec<String>),

    /// The `exp` claim lies too far in the past.
    #[error("token is expired")]
    Expired,

    /// The `iat` claim lies too far in the future.
    #[error("token was issued in the future")]
    IssuedInFuture,
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One recorded failure from a verification call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimFailure {
    /// The rule's key was absent from the claim mapping.
    NotFound { key: String },

    /// The rule's predicate rejected the claim value.
    Invalid { key: String, reason: ClaimError },
}

impl fmt::Display for ClaimFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimFailure::NotFound { key } => write!(f, "claim '{key}' not found"),
            ClaimFailure::Invalid { key, reason } => {
                write!(f, "claim '{key}' is invalid: {reason}")
            }
        }
    }
}

/// All failures from one verification call, in rule-list order.
///
/// `Display` joins the formatted failures with `"; "`, so the order of the
/// supplied rules determines the order of the aggregated message.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimFailures(pub Vec<ClaimFailure>);

impl fmt::Display for ClaimFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// oidc-verify errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ========================================================================
    // Claim validation
    // ========================================================================
    /// One or more claim rules failed; carries every failure from the call.
    #[error("{0}")]
    ClaimsInvalid(ClaimFailures),

    // ========================================================================
    // Token parsing / signature verification
    // ========================================================================
    #[error("parsing jwt: {0}")]
    Jwt(String),

    // ========================================================================
    // Remote/JWKS
    // ========================================================================
    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("expected status code 200 but got status code {status} with body: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Remote URL too long: {length} characters (maximum: {max} characters)")]
    RemoteUrlTooLong { length: usize, max: usize },

    #[error("Remote response too large: {size} bytes (maximum: {max} bytes)")]
    RemoteResponseTooLarge { size: usize, max: usize },

    #[error("Invalid JWK: {0}")]
    JwkInvalid(String),

    #[error(
        "JWK algorithm mismatch: JWK alg '{jwk_alg}' doesn't match token algorithm '{token_alg}'"
    )]
    JwkAlgorithmMismatch { jwk_alg: String, token_alg: String },

    #[error("Multiple keys found with kid '{kid}' ({count} matches)")]
    MultipleKeysFound { kid: String, count: usize },

    #[error("Key ID (kid) required: JWK set contains {key_count} keys")]
    KeyIdRequired { key_count: usize },
}

/// Result type alias for oidc-verify operations
pub type Result<T> = std::result::Result<T, Error>;
