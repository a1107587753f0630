//! URL validation for remote endpoints.
//!
//! Issuer URLs and JWKS URIs are validated before any fetch so malformed
//! or oversized URLs never reach the HTTP client.

use crate::error::{Error, Result};
use crate::limits::{MAX_ISSUER_URL_LENGTH, MAX_JWKS_URI_LENGTH};

fn parse_checked(raw: &str, max_length: usize, what: &str) -> Result<url::Url> {
    if raw.trim().is_empty() {
        return Err(Error::RemoteError(format!("{what} cannot be empty")));
    }

    if raw.len() > max_length {
        return Err(Error::RemoteUrlTooLong {
            length: raw.len(),
            max: max_length,
        });
    }

    let parsed = raw
        .parse::<url::Url>()
        .map_err(|e| Error::RemoteError(format!("invalid {what}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::RemoteError(format!(
            "{what} must use http or https scheme"
        )));
    }

    if parsed.host_str().is_none() {
        return Err(Error::RemoteError(format!("{what} must have a valid host")));
    }

    Ok(parsed)
}

/// Validate issuer URL format and size
pub(crate) fn validate_issuer_url(issuer: &str) -> Result<()> {
    parse_checked(issuer, MAX_ISSUER_URL_LENGTH, "issuer URL")?;

    // Issuer identifiers carry no trailing slash (OIDC Core 1.0).
    if issuer.ends_with('/') {
        return Err(Error::RemoteError(
            "issuer URL must not end with trailing slash".into(),
        ));
    }

    Ok(())
}

/// Validate JWKS URI format and size
pub(crate) fn validate_jwks_uri(uri: &str) -> Result<()> {
    parse_checked(uri, MAX_JWKS_URI_LENGTH, "JWKS URI")?;
    Ok(())
}
