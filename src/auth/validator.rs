// Signature, issuer and audience verification

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::{Map, Value};

use crate::auth::claims::ClaimSet;
use crate::auth::jwks::KeySet;
use crate::core::errors::AuthError;

/// Expected values checked during cryptographic verification
#[derive(Debug, Clone, Copy)]
pub struct VerificationPolicy<'a> {
    pub audience: &'a str,
    pub issuer: &'a str,
    pub algorithms: &'a [Algorithm],
    pub leeway_secs: u64,
}

/// Verify a token against an issuer's key set.
///
/// Looks up the key named by the header's `kid`, then checks the signature
/// together with `exp`, `aud` and `iss`. Only algorithms in the policy are
/// accepted; the header algorithm must also belong to the key's family.
pub fn verify_signature(
    token: &str,
    key_set: &KeySet,
    policy: &VerificationPolicy<'_>,
) -> Result<ClaimSet, AuthError> {
    let header = decode_header(token).map_err(|e| AuthError::TokenParse(e.to_string()))?;
    let kid = header
        .kid
        .ok_or_else(|| AuthError::TokenParse("token header has no key id".to_string()))?;
    let key = key_set
        .get(&kid)
        .ok_or_else(|| AuthError::KeyNotFound(kid.clone()))?;

    if !policy.algorithms.contains(&header.alg) {
        return Err(AuthError::SignatureInvalid(format!(
            "algorithm {:?} is not allowed",
            header.alg
        )));
    }

    // Pin to the header algorithm: jsonwebtoken rejects a validation whose
    // algorithm list mixes key families.
    let mut validation = Validation::new(header.alg);
    validation.leeway = policy.leeway_secs;
    validation.validate_exp = true;
    validation.set_audience(&[policy.audience]);
    validation.set_issuer(&[policy.issuer]);
    validation.set_required_spec_claims(&["exp", "aud", "iss"]);

    let data = decode::<Map<String, Value>>(token, key, &validation).map_err(map_decode_error)?;
    Ok(ClaimSet::new(data.claims))
}

fn map_decode_error(error: jsonwebtoken::errors::Error) -> AuthError {
    match error.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::ExpiredSignature
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::MissingAlgorithm
        | ErrorKind::MissingRequiredClaim(_) => AuthError::SignatureInvalid(error.to_string()),
        _ => AuthError::TokenParse(error.to_string()),
    }
}
