// Unit tests for signature verification against the JWKS fixture

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use gacha_api::auth::validator::{verify_signature, VerificationPolicy};
use gacha_api::core::errors::AuthError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

use super::common::*;

const RS256_ONLY: &[Algorithm] = &[Algorithm::RS256];

fn policy() -> VerificationPolicy<'static> {
    VerificationPolicy {
        audience: AUDIENCE,
        issuer: ISSUER,
        algorithms: RS256_ONLY,
        leeway_secs: 0,
    }
}

#[test]
fn test_primary_key_token_verifies() {
    let token = sign(&valid_claims(ISSUER, "create:image"));
    let claims = verify_signature(&token, &fixture_key_set(), &policy()).unwrap();
    assert_eq!(claims.get_str("email", Some(NAMESPACE)), Some(USER));
    assert_eq!(claims.get_str("scope", None), Some("create:image"));
}

#[test]
fn test_rogue_key_under_published_kid_is_signature_invalid() {
    let token = sign_with(&valid_claims(ISSUER, ""), ROGUE_KEY_PEM, PRIMARY_KID);
    let err = verify_signature(&token, &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)), "got {:?}", err);
}

#[test]
fn test_rogue_key_under_unknown_kid_is_key_not_found() {
    let token = sign_with(&valid_claims(ISSUER, ""), ROGUE_KEY_PEM, "rogue-key");
    let err = verify_signature(&token, &fixture_key_set(), &policy()).unwrap_err();
    assert_eq!(err, AuthError::KeyNotFound("rogue-key".to_string()));
}

const RS256_AND_ES256: &[Algorithm] = &[Algorithm::RS256, Algorithm::ES256];

#[test]
fn test_ec_key_token_verifies_when_es256_allowed() {
    let token = sign_es256(&valid_claims(ISSUER, "read:image"));
    let mixed = VerificationPolicy {
        algorithms: RS256_AND_ES256,
        ..policy()
    };
    let claims = verify_signature(&token, &fixture_key_set(), &mixed).unwrap();
    assert_eq!(claims.get_str("scope", None), Some("read:image"));
}

#[test]
fn test_es256_token_rejected_when_only_rs256_allowed() {
    let token = sign_es256(&valid_claims(ISSUER, ""));
    let err = verify_signature(&token, &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)), "got {:?}", err);
}

#[test]
fn test_rsa_signature_under_ec_kid_is_signature_invalid() {
    // RS256 header pointing at the EC key: key family and algorithm disagree
    let token = sign_with(&valid_claims(ISSUER, ""), PRIMARY_KEY_PEM, EC_KID);
    let mixed = VerificationPolicy {
        algorithms: RS256_AND_ES256,
        ..policy()
    };
    let err = verify_signature(&token, &fixture_key_set(), &mixed).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)), "got {:?}", err);
}

#[test]
fn test_alg_none_token_is_rejected() {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT","kid":"primary-key"}"#);
    let payload = URL_SAFE_NO_PAD.encode(valid_claims(ISSUER, "delete:image").to_string());
    for signature in ["", "c2ln"] {
        let token = format!("{}.{}.{}", header, payload, signature);
        let err = verify_signature(&token, &fixture_key_set(), &policy()).unwrap_err();
        assert!(matches!(err, AuthError::TokenParse(_)), "got {:?}", err);
    }
}

#[test]
fn test_hs256_signed_with_public_key_is_rejected() {
    // Classic key confusion: the published RSA key material used as an HMAC secret
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(PRIMARY_KID.to_string());
    let secret = EncodingKey::from_secret(JWKS_FIXTURE.as_bytes());
    let token = encode(&header, &valid_claims(ISSUER, "delete:image"), &secret).unwrap();

    let err = verify_signature(&token, &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)), "got {:?}", err);

    // still rejected if HS256 somehow reached the allow-list
    let permissive = VerificationPolicy {
        algorithms: &[Algorithm::RS256, Algorithm::HS256],
        ..policy()
    };
    let err = verify_signature(&token, &fixture_key_set(), &permissive).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)), "got {:?}", err);
}

#[test]
fn test_tampered_payload_is_signature_invalid() {
    let token = sign(&valid_claims(ISSUER, "read:image"));
    let forged = sign(&valid_claims(ISSUER, "delete:image"));

    // header and signature from the first token, payload from the second
    let parts: Vec<&str> = token.split('.').collect();
    let forged_payload = forged.split('.').nth(1).unwrap();
    let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    let err = verify_signature(&tampered, &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}

#[test]
fn test_expired_token_is_signature_invalid() {
    let claims = with(valid_claims(ISSUER, ""), "exp", json!(now_secs() - 30));
    let err = verify_signature(&sign(&claims), &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}

#[test]
fn test_leeway_tolerates_recent_expiry() {
    let claims = with(valid_claims(ISSUER, ""), "exp", json!(now_secs() - 30));
    let lenient = VerificationPolicy {
        leeway_secs: 120,
        ..policy()
    };
    assert!(verify_signature(&sign(&claims), &fixture_key_set(), &lenient).is_ok());
}

#[test]
fn test_missing_exp_is_rejected() {
    let claims = without(valid_claims(ISSUER, ""), "exp");
    let err = verify_signature(&sign(&claims), &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}

#[test]
fn test_wrong_audience_is_signature_invalid() {
    let claims = with(valid_claims(ISSUER, ""), "aud", json!("https://other.api"));
    let err = verify_signature(&sign(&claims), &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}

#[test]
fn test_issuer_is_reverified() {
    let claims = valid_claims("https://other-issuer.example.com/", "");
    let err = verify_signature(&sign(&claims), &fixture_key_set(), &policy()).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}

#[test]
fn test_disallowed_algorithm_is_signature_invalid() {
    let token = sign(&valid_claims(ISSUER, ""));
    let strict = VerificationPolicy {
        algorithms: &[Algorithm::PS256],
        ..policy()
    };
    let err = verify_signature(&token, &fixture_key_set(), &strict).unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}
