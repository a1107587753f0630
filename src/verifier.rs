//! Issuer-bound token verification.

use crate::claims::{self, ClaimMap};
use crate::discovery::discover_jwks_uri;
use crate::error::{Error, Result};
use crate::jwks::{fetch_jwks, find_key, JwkSet};
use crate::rules::{
    exact_match, timestamp_window, unix_now, ClaimRule, NowProvider, NumericMode, TimestampCheck,
};
use jsonwebtoken::{Algorithm, Validation};
use moka::future::Cache;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_WELL_KNOWN_ENDPOINT: &str = "/.well-known/openid-configuration";

/// Fetched key sets are reused for five minutes before rediscovery.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_CACHE_CAPACITY: u64 = 16;

/// A parsed and verified token.
#[derive(Debug, Clone, PartialEq)]
pub struct Jwt {
    /// The token's full decoded claim set.
    pub claims: ClaimMap,
}

/// Parses bearer tokens issued by one OIDC issuer and verifies caller
/// supplied claim rules against the decoded claim set.
///
/// The verifier resolves the issuer's signing keys through OIDC discovery
/// and JWKS fetching, caching the fetched key set. Signature verification
/// is delegated to `jsonwebtoken`; its built-in temporal and audience
/// checks are disabled, so claim policy lives exclusively in the rules
/// passed to [`Verifier::parse_and_verify`]. A configured verifier is
/// immutable and can be shared across tasks.
///
/// Configuration follows the builder pattern:
///
/// ```ignore
/// let verifier = Verifier::new("https://auth.example.com")
///     .numeric_mode(NumericMode::FixedPrecision)
///     .build();
///
/// let jwt = verifier
///     .parse_and_verify(token, &[
///         verifier.issuer_rule(),
///         rules::audience("my-api"),
///         verifier.expiration_rule(60),
///     ])
///     .await?;
/// ```
#[derive(Clone)]
pub struct Verifier {
    issuer: String,
    well_known_endpoint: String,
    client: reqwest::Client,
    cache: Option<Cache<String, Arc<JwkSet>>>,
    numeric_mode: NumericMode,
    now: NowProvider,
}

impl Verifier {
    /// Create a verifier for the given issuer with default configuration.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            well_known_endpoint: DEFAULT_WELL_KNOWN_ENDPOINT.to_owned(),
            client: reqwest::Client::new(),
            cache: Some(
                Cache::builder()
                    .time_to_live(DEFAULT_CACHE_TTL)
                    .max_capacity(DEFAULT_CACHE_CAPACITY)
                    .build(),
            ),
            numeric_mode: NumericMode::default(),
            now: Arc::new(unix_now),
        }
    }

    /// Set the HTTP client used for discovery and JWKS fetches.
    pub fn http_client(&mut self, client: reqwest::Client) -> &mut Self {
        self.client = client;
        self
    }

    /// Override the path of the discovery document.
    ///
    /// Defaults to `/.well-known/openid-configuration`.
    pub fn well_known_endpoint(&mut self, endpoint: impl Into<String>) -> &mut Self {
        let endpoint = endpoint.into();
        self.well_known_endpoint = if endpoint.starts_with('/') {
            endpoint
        } else {
            format!("/{endpoint}")
        };
        self
    }

    /// Replace the key-set cache.
    pub fn cache(&mut self, cache: Cache<String, Arc<JwkSet>>) -> &mut Self {
        self.cache = Some(cache);
        self
    }

    /// Disable key-set caching; every verification refetches the keys.
    pub fn without_cache(&mut self) -> &mut Self {
        self.cache = None;
        self
    }

    /// Select how timestamp claims are decoded by the timestamp rules
    /// built through this verifier.
    pub fn numeric_mode(&mut self, mode: NumericMode) -> &mut Self {
        self.numeric_mode = mode;
        self
    }

    /// Inject the now-provider used by timestamp rules built through this
    /// verifier. Defaults to the wall clock.
    pub fn now<F>(&mut self, now: F) -> &mut Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.now = Arc::new(now);
        self
    }

    /// Finish configuration.
    pub fn build(&mut self) -> Self {
        self.clone()
    }
}

impl Verifier {
    /// Rule requiring the `iss` claim to equal this verifier's issuer.
    pub fn issuer_rule(&self) -> ClaimRule {
        exact_match("iss", self.issuer.clone())
    }

    /// Rule failing once the `exp` claim lies more than `leeway_seconds`
    /// in the past.
    pub fn expiration_rule(&self, leeway_seconds: u64) -> ClaimRule {
        timestamp_window(
            "exp",
            leeway_seconds,
            TimestampCheck::Expiration,
            self.numeric_mode,
            self.now.clone(),
        )
    }

    /// Rule failing once the `iat` claim lies more than `leeway_seconds`
    /// in the future.
    pub fn issued_at_rule(&self, leeway_seconds: u64) -> ClaimRule {
        timestamp_window(
            "iat",
            leeway_seconds,
            TimestampCheck::IssuedAt,
            self.numeric_mode,
            self.now.clone(),
        )
    }

    /// Parse a token, verify its signature against the issuer's keys, and
    /// evaluate the given claim rules against the decoded claim set.
    ///
    /// Key resolution, parsing, and signature errors short-circuit before
    /// any rule runs. Rule failures never short-circuit: every rule is
    /// evaluated and all failures come back in one
    /// [`Error::ClaimsInvalid`]. With no rules, only the signature is
    /// verified.
    pub async fn parse_and_verify(&self, token: &str, rules: &[ClaimRule]) -> Result<Jwt> {
        let claims = self.parse_token(token).await?;
        claims::verify(&claims, rules)?;
        Ok(Jwt { claims })
    }

    async fn parse_token(&self, token: &str) -> Result<ClaimMap> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| Error::Jwt(format!("parsing jwt: {e}")))?;

        let jwks = self.key_set().await?;
        let jwk = find_key(&jwks, header.kid.as_deref())?;

        if let Some(alg) = &jwk.alg {
            match Algorithm::from_str(alg) {
                Ok(jwk_alg) if jwk_alg == header.alg => {}
                _ => {
                    return Err(Error::JwkAlgorithmMismatch {
                        jwk_alg: alg.clone(),
                        token_alg: format!("{:?}", header.alg),
                    })
                }
            }
        }

        let key = jwk.decoding_key()?;

        // Claim policy belongs to the rules; the parser only authenticates.
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = jsonwebtoken::decode::<ClaimMap>(token, &key, &validation)
            .map_err(|e| Error::Jwt(format!("parsing jwt: {e}")))?;

        Ok(data.claims)
    }

    /// The issuer's key set: cached if available, otherwise resolved via
    /// discovery and JWKS fetch and cached for subsequent calls.
    async fn key_set(&self) -> Result<Arc<JwkSet>> {
        if let Some(cache) = &self.cache {
            if let Some(jwks) = cache.get(&self.issuer).await {
                debug!(issuer = %self.issuer, "using cached jwk set");
                return Ok(jwks);
            }
        }

        let jwks_uri =
            discover_jwks_uri(&self.issuer, &self.well_known_endpoint, &self.client).await?;
        let jwks = Arc::new(fetch_jwks(&self.client, &jwks_uri).await?);

        if let Some(cache) = &self.cache {
            cache.insert(self.issuer.clone(), jwks.clone()).await;
        }

        Ok(jwks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_normalizes_well_known_endpoint() {
        let verifier = Verifier::new("https://issuer.example")
            .well_known_endpoint("custom/metadata")
            .build();
        assert_eq!(verifier.well_known_endpoint, "/custom/metadata");

        let verifier = Verifier::new("https://issuer.example")
            .well_known_endpoint("/custom/metadata")
            .build();
        assert_eq!(verifier.well_known_endpoint, "/custom/metadata");
    }

    #[test]
    fn issuer_rule_binds_configured_issuer() {
        let verifier = Verifier::new("https://issuer.example").build();
        let rule = verifier.issuer_rule();
        assert_eq!(rule.key(), "iss");
        assert!(rule
            .check(&serde_json::json!("https://issuer.example"))
            .is_ok());
        assert!(rule.check(&serde_json::json!("https://other.example")).is_err());
    }

    #[test]
    fn timestamp_rules_capture_injected_now_and_mode() {
        let verifier = Verifier::new("https://issuer.example")
            .numeric_mode(NumericMode::FixedPrecision)
            .now(|| 1_700_000_000)
            .build();

        let exp = verifier.expiration_rule(60);
        assert_eq!(exp.key(), "exp");
        assert!(exp.check(&serde_json::json!(1_700_000_000i64 - 60)).is_ok());
        assert!(exp.check(&serde_json::json!(1_700_000_000i64 - 61)).is_err());
        // FixedPrecision rejects float-shaped timestamps.
        assert!(exp.check(&serde_json::json!(1.7e9)).is_err());

        let iat = verifier.issued_at_rule(60);
        assert_eq!(iat.key(), "iat");
        assert!(iat.check(&serde_json::json!(1_700_000_000i64 + 60)).is_ok());
        assert!(iat.check(&serde_json::json!(1_700_000_000i64 + 61)).is_err());
    }
}
