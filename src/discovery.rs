//! OIDC discovery.
//!
//! Resolves an issuer's JWKS URI from its discovery document, served at
//! `/.well-known/openid-configuration` by default ([OpenID Connect
//! Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html));
//! the endpoint path is overridable on the verifier.

use crate::error::{Error, Result};
use crate::jwks::fetch_url;
use crate::limits::MAX_DISCOVERY_RESPONSE_SIZE;
use crate::url::{validate_issuer_url, validate_jwks_uri};
use serde::Deserialize;
use tracing::debug;

/// Minimal discovery document; only the JWKS URI is consumed.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OidcDiscovery {
    pub jwks_uri: String,
}

/// Build the URL to the discovery document from an issuer string
fn build_well_known_url(issuer: &str, endpoint: &str) -> Result<String> {
    let base = issuer.trim_end_matches('/');

    if base.is_empty() {
        return Err(Error::RemoteError("discovery: empty issuer".into()));
    }

    let endpoint = endpoint.trim_start_matches('/');
    Ok(format!("{base}/{endpoint}"))
}

/// Discover the JWKS URI from the issuer's well-known configuration.
///
/// Discovery results are not cached here; the verifier caches at the
/// key-set level, so discovery only runs when no cached key set exists.
pub(crate) async fn discover_jwks_uri(
    issuer: &str,
    endpoint: &str,
    client: &reqwest::Client,
) -> Result<String> {
    validate_issuer_url(issuer)?;

    let url = build_well_known_url(issuer, endpoint)?;
    debug!(%url, "fetching oidc discovery document");
    let bytes = fetch_url(client, &url).await?;

    if bytes.len() > MAX_DISCOVERY_RESPONSE_SIZE {
        return Err(Error::RemoteResponseTooLarge {
            size: bytes.len(),
            max: MAX_DISCOVERY_RESPONSE_SIZE,
        });
    }

    let doc: OidcDiscovery = serde_json::from_slice(&bytes)
        .map_err(|e| Error::RemoteError(format!("discovery: json-decoding response body: {e}")))?;

    if doc.jwks_uri.trim().is_empty() {
        return Err(Error::RemoteError(
            "discovery: missing or empty jwks_uri".into(),
        ));
    }

    validate_jwks_uri(&doc.jwks_uri)?;

    Ok(doc.jwks_uri)
}
