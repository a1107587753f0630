//! JWKS fetching and key selection.

use crate::error::{Error, Result};
use crate::limits::MAX_JWKS_RESPONSE_SIZE;
use crate::url::validate_jwks_uri;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tracing::debug;

/// Fetch data from a URL using reqwest
pub(crate) async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::RemoteError(format!("network: {e}")))?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::RemoteError(format!("network: {e}")))?;

    // Anything other than 200 surfaces the status and the raw body so
    // callers see exactly what the issuer returned.
    if status.as_u16() != 200 {
        return Err(Error::RemoteStatus {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    Ok(bytes.to_vec())
}

/// One key from a JWK set.
///
/// Only the members needed to build a verification key are modeled: RSA
/// components, EC components, and the symmetric key field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC" or "oct")
    pub kty: String,

    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,

    /// Intended algorithm
    #[serde(default)]
    pub alg: Option<String>,

    /// Intended use ("sig" or "enc")
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus
    #[serde(default)]
    pub n: Option<String>,

    /// RSA exponent
    #[serde(default)]
    pub e: Option<String>,

    /// EC curve
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate
    #[serde(default)]
    pub y: Option<String>,

    /// Symmetric key (base64url)
    #[serde(default)]
    pub k: Option<String>,
}

impl Jwk {
    /// Build a `jsonwebtoken` decoding key from this JWK.
    pub(crate) fn decoding_key(&self) -> Result<DecodingKey> {
        match self.kty.as_str() {
            "RSA" => {
                let n = require(&self.n, "n", &self.kty)?;
                let e = require(&self.e, "e", &self.kty)?;
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| Error::JwkInvalid(format!("rsa components: {e}")))
            }
            "EC" => {
                let x = require(&self.x, "x", &self.kty)?;
                let y = require(&self.y, "y", &self.kty)?;
                DecodingKey::from_ec_components(x, y)
                    .map_err(|e| Error::JwkInvalid(format!("ec components: {e}")))
            }
            "oct" => {
                let k = require(&self.k, "k", &self.kty)?;
                let secret = URL_SAFE_NO_PAD
                    .decode(k)
                    .map_err(|e| Error::JwkInvalid(format!("symmetric key: {e}")))?;
                Ok(DecodingKey::from_secret(&secret))
            }
            other => Err(Error::JwkInvalid(format!("unsupported key type '{other}'"))),
        }
    }
}

fn require<'a>(field: &'a Option<String>, name: &str, kty: &str) -> Result<&'a str> {
    field
        .as_deref()
        .ok_or_else(|| Error::JwkInvalid(format!("{kty} key is missing '{name}'")))
}

/// JSON Web Key Set (JWKS)
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    /// The keys in the set
    pub keys: Vec<Jwk>,
}

/// Fetch and parse a JWKS document from the given URI
pub(crate) async fn fetch_jwks(client: &reqwest::Client, jwks_uri: &str) -> Result<JwkSet> {
    validate_jwks_uri(jwks_uri)?;

    debug!(%jwks_uri, "fetching jwk set");
    let bytes = fetch_url(client, jwks_uri).await?;

    if bytes.len() > MAX_JWKS_RESPONSE_SIZE {
        return Err(Error::RemoteResponseTooLarge {
            size: bytes.len(),
            max: MAX_JWKS_RESPONSE_SIZE,
        });
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::RemoteError(format!("jwks: json-decoding response body: {e}")))
}

/// Find a key in a JWKS by key ID.
///
/// With a kid, exactly one key must match: duplicates are ambiguous and
/// rejected. Without a kid, a single-key set is an unambiguous fallback;
/// anything larger requires the token to carry one.
pub(crate) fn find_key<'a>(jwks: &'a JwkSet, kid: Option<&str>) -> Result<&'a Jwk> {
    if let Some(kid) = kid {
        let matches: Vec<_> = jwks
            .keys
            .iter()
            .filter(|key| key.kid.as_deref() == Some(kid))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::RemoteError("jwks: no matching key found".into())),
            [key] => Ok(*key),
            keys => Err(Error::MultipleKeysFound {
                kid: kid.into(),
                count: keys.len(),
            }),
        }
    } else {
        match jwks.keys.as_slice() {
            [] => Err(Error::RemoteError("jwks: no keys in set".into())),
            [key] => Ok(key),
            keys => Err(Error::KeyIdRequired {
                key_count: keys.len(),
            }),
        }
    }
}
