//! OIDC bearer-token verification with composable claim rules.
//!
//! This crate parses JWTs issued by an OpenID Connect issuer, resolves the
//! issuer's signing keys through OIDC discovery and JWKS fetching, and
//! validates the decoded claim set against a caller-supplied list of
//! [`ClaimRule`]s.
//!
//! ## Claim rules
//!
//! A rule pairs a claim key with a predicate over the claim's decoded
//! value. Constructors cover the common checks: [`exact_match`] (and its
//! [`audience`] / [`client_id`] / [`Verifier::issuer_rule`]
//! specializations), [`contains_all`] for array claims, and
//! [`timestamp_window`] (via [`Verifier::expiration_rule`] and
//! [`Verifier::issued_at_rule`]) for `exp`/`iat` with a leeway window.
//! Custom predicates plug in through [`ClaimRule::new`].
//!
//! Rules never fail fast: [`verify`] evaluates every rule and folds all
//! failures into one [`Error::ClaimsInvalid`], so a caller debugging a
//! rejected token sees the complete diagnostic in a single round trip:
//!
//! ```text
//! claim 'aud' is invalid: expected 'foo' but got 'Tashuan'; claim 'sub' not found
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use oidc_verify::{audience, contains_all, Verifier};
//!
//! let verifier = Verifier::new("https://auth.example.com").build();
//!
//! let jwt = verifier
//!     .parse_and_verify(
//!         token,
//!         &[
//!             verifier.issuer_rule(),
//!             audience("my-api"),
//!             verifier.expiration_rule(60),
//!             verifier.issued_at_rule(60),
//!             contains_all("roles", ["admin".to_string()]),
//!         ],
//!     )
//!     .await?;
//!
//! println!("subject: {:?}", jwt.claims.get("sub"));
//! ```
//!
//! Signature verification is delegated to [`jsonwebtoken`]; HTTP transport
//! is [`reqwest`]; fetched key sets are cached with [`moka`]. The built-in
//! temporal and audience checks of the underlying parser are disabled:
//! claim policy lives exclusively in the rules, and a call without rules
//! verifies only the signature.

mod claims;
mod discovery;
mod error;
mod jwks;
mod limits;
mod rules;
mod url;
mod verifier;

// Public Interface
pub use claims::{verify, ClaimMap, FromClaim};
pub use error::{ClaimError, ClaimFailure, ClaimFailures, Error, Result};
pub use jwks::{Jwk, JwkSet};
pub use rules::{
    audience, client_id, contains_all, exact_match, timestamp_window, ClaimRule, NowProvider,
    NumericMode, Rule, TimestampCheck,
};
pub use verifier::{Jwt, Verifier};
