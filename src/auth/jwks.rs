// Remote key set retrieval

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::errors::{AuthError, GachaError};

/// Largest key-set document accepted from an issuer
pub const MAX_JWKS_SIZE: usize = 1 << 20;

const WELL_KNOWN_JWKS_PATH: &str = ".well-known/jwks.json";

/// Published key-set document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// A single published key. RSA keys and P-256/P-384 EC signing keys are usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(rename = "use", default)]
    pub use_: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
}

/// Why a published key was left out of a [`KeySet`]
#[derive(Debug, thiserror::Error)]
pub enum JwkError {
    #[error("key has no kid")]
    MissingKeyId,
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("key is not a signing key (use = {0})")]
    NotSigningKey(String),
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),
    #[error("missing key component '{0}'")]
    MissingComponent(&'static str),
    #[error("invalid key components: {0}")]
    InvalidComponents(#[source] jsonwebtoken::errors::Error),
}

/// Verification keys indexed by key id
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

impl KeySet {
    /// Build a key set from a published document, skipping unusable keys.
    pub fn from_jwks(jwks: Jwks) -> Self {
        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            match parse_jwk(&jwk) {
                Ok((kid, key)) => {
                    keys.insert(kid, key);
                }
                Err(e) => {
                    warn!(kid = ?jwk.kid, kty = %jwk.kty, error = %e, "Skipping unusable JWK");
                }
            }
        }
        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet").field("kids", &self.kids()).finish()
    }
}

/// Convert a published key into a verification key.
///
/// The key family is fixed here; a token whose header algorithm belongs to
/// another family is rejected at verification.
pub fn parse_jwk(jwk: &Jwk) -> Result<(String, DecodingKey), JwkError> {
    let kid = jwk.kid.clone().ok_or(JwkError::MissingKeyId)?;
    if let Some(ref use_) = jwk.use_ {
        if use_ != "sig" {
            return Err(JwkError::NotSigningKey(use_.clone()));
        }
    }
    let key = match jwk.kty.as_str() {
        "RSA" => parse_rsa(jwk)?,
        "EC" => parse_ec(jwk)?,
        other => return Err(JwkError::UnsupportedKeyType(other.to_string())),
    };
    Ok((kid, key))
}

fn parse_rsa(jwk: &Jwk) -> Result<DecodingKey, JwkError> {
    let n = jwk.n.as_deref().ok_or(JwkError::MissingComponent("n"))?;
    let e = jwk.e.as_deref().ok_or(JwkError::MissingComponent("e"))?;
    DecodingKey::from_rsa_components(n, e).map_err(JwkError::InvalidComponents)
}

fn parse_ec(jwk: &Jwk) -> Result<DecodingKey, JwkError> {
    let crv = jwk.crv.as_deref().ok_or(JwkError::MissingComponent("crv"))?;
    if !matches!(crv, "P-256" | "P-384") {
        return Err(JwkError::UnsupportedCurve(crv.to_string()));
    }
    let x = jwk.x.as_deref().ok_or(JwkError::MissingComponent("x"))?;
    let y = jwk.y.as_deref().ok_or(JwkError::MissingComponent("y"))?;
    DecodingKey::from_ec_components(x, y).map_err(JwkError::InvalidComponents)
}

/// Location of an issuer's key-set document.
pub fn jwks_url(issuer: &str) -> String {
    if issuer.ends_with('/') {
        format!("{}{}", issuer, WELL_KNOWN_JWKS_PATH)
    } else {
        format!("{}/{}", issuer, WELL_KNOWN_JWKS_PATH)
    }
}

/// Anything that can produce an issuer's current key set
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch_key_set(&self, issuer: &str) -> Result<Arc<KeySet>, AuthError>;
}

/// HTTP key-set client.
///
/// Every call performs one request bounded by the configured timeout. Failures
/// are never retried.
#[derive(Clone)]
pub struct JwksClient {
    http_client: reqwest::Client,
}

impl JwksClient {
    pub fn new(timeout_secs: u64) -> Result<Self, GachaError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                GachaError::ConfigurationError(format!("Failed to build JWKS HTTP client: {}", e))
            })?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl KeySetSource for JwksClient {
    async fn fetch_key_set(&self, issuer: &str) -> Result<Arc<KeySet>, AuthError> {
        let url = jwks_url(issuer);
        debug!(url = %url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(format!("request to {} failed: {}", url, e)))?;

        if response.status() != StatusCode::OK {
            return Err(AuthError::KeySetUnavailable(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(format!("reading {} failed: {}", url, e)))?;
        if payload.len() > MAX_JWKS_SIZE {
            return Err(AuthError::KeySetUnavailable(format!(
                "JWKS payload too large: {} bytes",
                payload.len()
            )));
        }

        let jwks: Jwks = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::KeySetUnavailable(format!("invalid JWKS document: {}", e)))?;
        let key_set = KeySet::from_jwks(jwks);
        if key_set.is_empty() {
            warn!(url = %url, "JWKS has no usable signing keys");
        }
        debug!(url = %url, keys = key_set.len(), "JWKS fetched");
        Ok(Arc::new(key_set))
    }
}
