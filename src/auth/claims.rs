//! Claim extraction.
//!
//! Reads claims from a token payload without verifying its signature. The
//! unverified reader exists only to pick which issuer's key set to fetch;
//! authorization decisions read the [`ClaimSet`] returned by
//! signature verification instead.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{Map, Value};

use crate::core::errors::AuthError;

/// A decoded token payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Look up a claim, optionally under a namespace URI.
    pub fn get(&self, key: &str, namespace: Option<&str>) -> Option<&Value> {
        self.0.get(&namespaced_key(key, namespace))
    }

    /// Look up a string-valued claim. Non-string values read as absent.
    pub fn get_str(&self, key: &str, namespace: Option<&str>) -> Option<&str> {
        self.get(key, namespace).and_then(Value::as_str)
    }
}

/// Build the claim key for `key` under `namespace` (`{namespace}/{key}`).
///
/// A trailing slash on the namespace is not doubled.
pub fn namespaced_key(key: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns.trim_end_matches('/'), key),
        _ => key.to_string(),
    }
}

/// Decode the payload segment of a compact JWS without verifying it.
pub fn decode_unverified(token: &str) -> Result<ClaimSet, AuthError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::MalformedToken(
            "expected three dot-separated segments".to_string(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.as_bytes())
        .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {}", e)))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(ClaimSet(claims)),
        Ok(_) => Err(AuthError::MalformedToken(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(AuthError::MalformedToken(format!("payload is not JSON: {}", e))),
    }
}

/// Read a single claim from an unverified token.
///
/// Only for routing decisions; the value is attacker-controlled until the
/// signature has been verified.
pub fn get_claim(
    token: &str,
    key: &str,
    namespace: Option<&str>,
) -> Result<Option<Value>, AuthError> {
    Ok(decode_unverified(token)?.get(key, namespace).cloned())
}
