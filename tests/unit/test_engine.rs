// Unit tests for the authorization pipeline

use gacha_api::auth::engine::{AuthOutcome, AuthorizationEngine};
use gacha_api::core::errors::AuthError;
use gacha_api::core::models::Principal;
use gacha_api::state::key_set_cache::KeySetCache;
use serde_json::json;
use std::sync::Arc;

use super::common::*;

static_assertions::assert_impl_all!(AuthorizationEngine: Send, Sync);
static_assertions::assert_impl_all!(KeySetCache: Send, Sync);

const NO_SCOPES: [&str; 0] = [];

#[tokio::test]
async fn test_granted_when_required_scopes_present() {
    let (engine, _) = fixture_engine();
    let token = sign(&valid_claims(ISSUER, "create:image read:image"));

    let outcome = engine
        .authorize_user_for_operation(&token, &["create:image"])
        .await
        .unwrap();
    assert_eq!(outcome, AuthOutcome::Granted(Principal::new(USER, TENANT)));
    assert_eq!(outcome.into_parts(), (true, Principal::new(USER, TENANT)));
}

#[tokio::test]
async fn test_denied_when_scope_missing() {
    let (engine, _) = fixture_engine();
    let token = sign(&valid_claims(ISSUER, "create:image read:image"));

    let outcome = engine
        .authorize_user_for_operation(&token, &["delete:image"])
        .await
        .unwrap();
    assert!(!outcome.is_authorized());
    assert_eq!(outcome.principal().id, USER);
    match outcome {
        AuthOutcome::Denied { missing_scopes, .. } => {
            assert_eq!(missing_scopes, vec!["delete:image".to_string()]);
        }
        other => panic!("expected denial, got {:?}", other),
    }
}

#[tokio::test]
async fn test_absent_scope_claim_with_no_required_scopes() {
    let (engine, _) = fixture_engine();
    let token = sign(&without(valid_claims(ISSUER, ""), "scope"));

    let err = engine
        .authorize_user_for_operation(&token, &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::MissingScopeClaim);
}

#[tokio::test]
async fn test_empty_requirement_ignores_scope_contents() {
    let (engine, _) = fixture_engine();
    for scope in ["", "openid", "delete:everything"] {
        let token = sign(&valid_claims(ISSUER, scope));
        let outcome = engine
            .authorize_user_for_operation(&token, &NO_SCOPES)
            .await
            .unwrap();
        assert!(outcome.is_authorized(), "scope {:?}", scope);
    }
}

#[tokio::test]
async fn test_permissions_claim_grants_scopes() {
    let (engine, _) = fixture_engine();
    let claims = with(
        valid_claims(ISSUER, "openid"),
        "permissions",
        json!(["update:user_alias"]),
    );
    let outcome = engine
        .authorize_user_for_operation(&sign(&claims), &["update:user_alias"])
        .await
        .unwrap();
    assert!(outcome.is_authorized());
}

#[tokio::test]
async fn test_unlisted_issuer_never_fetches_keys() {
    let (engine, source) = fixture_engine();
    let token = sign(&valid_claims("https://evil.example.com/", "create:image"));

    let err = engine
        .authorize_user_for_operation(&token, &["create:image"])
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidIssuer);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_issuer_match_is_exact() {
    let (engine, source) = fixture_engine();
    let token = sign(&valid_claims("https://issuer.example.com", "create:image"));

    let err = engine
        .authorize_user_for_operation(&token, &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidIssuer);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_missing_issuer_is_invalid_issuer() {
    let (engine, source) = fixture_engine();
    let token = sign(&without(valid_claims(ISSUER, ""), "iss"));

    let err = engine
        .authorize_user_for_operation(&token, &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidIssuer);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_malformed_token() {
    let (engine, source) = fixture_engine();
    for token in ["", "not-a-token", "a.b", "a.!!!.c"] {
        let err = engine
            .authorize_user_for_operation(token, &NO_SCOPES)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)), "{:?} gave {:?}", token, err);
    }
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_bad_signature_returns_no_principal() {
    let (engine, _) = fixture_engine();
    let token = sign_with(&valid_claims(ISSUER, "create:image"), ROGUE_KEY_PEM, PRIMARY_KID);

    let err = engine
        .authorize_user_for_operation(&token, &["create:image"])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (engine, _) = fixture_engine();
    let claims = with(valid_claims(ISSUER, "create:image"), "exp", json!(now_secs() - 60));

    let err = engine
        .authorize_user_for_operation(&sign(&claims), &NO_SCOPES)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
}

#[tokio::test]
async fn test_unknown_kid_refreshes_once_then_fails() {
    let (engine, source) = fixture_engine();
    let warm = sign(&valid_claims(ISSUER, ""));
    engine.authorize_user_for_operation(&warm, &NO_SCOPES).await.unwrap();
    assert_eq!(source.fetch_count(), 1);

    let token = sign_with(&valid_claims(ISSUER, ""), ROGUE_KEY_PEM, "rotated-key");
    let err = engine
        .authorize_user_for_operation(&token, &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::KeyNotFound("rotated-key".to_string()));
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_key_set_is_cached_between_requests() {
    let (engine, source) = fixture_engine();
    let token = sign(&valid_claims(ISSUER, ""));
    for _ in 0..3 {
        engine.authorize_user_for_operation(&token, &NO_SCOPES).await.unwrap();
    }
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_missing_principal_claim() {
    let (engine, _) = fixture_engine();
    let claims = without(valid_claims(ISSUER, "create:image"), &namespaced("email"));

    let err = engine
        .authorize_user_for_operation(&sign(&claims), &["create:image"])
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::MissingPrincipalClaim);
}

#[tokio::test]
async fn test_unnamespaced_principal_claim_is_ignored() {
    let (engine, _) = fixture_engine();
    let claims = without(valid_claims(ISSUER, ""), &namespaced("email"));
    let claims = with(claims, "email", json!(USER));

    let err = engine
        .authorize_user_for_operation(&sign(&claims), &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::MissingPrincipalClaim);
}

#[tokio::test]
async fn test_missing_tenant_claim() {
    let (engine, _) = fixture_engine();
    let claims = without(valid_claims(ISSUER, ""), &namespaced("tenant"));

    let err = engine
        .authorize_user_for_operation(&sign(&claims), &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::MissingTenantClaim);
}

#[tokio::test]
async fn test_tenant_mismatch() {
    let (engine, _) = fixture_engine();
    let claims = with(valid_claims(ISSUER, ""), &namespaced("tenant"), json!("other-tenant"));

    let err = engine
        .authorize_user_for_operation(&sign(&claims), &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::TenantMismatch);
}

#[tokio::test]
async fn test_principal_checked_before_tenant() {
    let (engine, _) = fixture_engine();
    let claims = without(valid_claims(ISSUER, ""), &namespaced("email"));
    let claims = with(claims, &namespaced("tenant"), json!("other-tenant"));

    let err = engine
        .authorize_user_for_operation(&sign(&claims), &NO_SCOPES)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::MissingPrincipalClaim);
}

#[tokio::test]
async fn test_trailing_slash_namespace_reads_same_claims() {
    let source = Arc::new(FixtureKeySource::default());
    let mut config = auth_config(ISSUER);
    config.namespace = format!("{}/", NAMESPACE);
    let engine = AuthorizationEngine::new(config, Arc::new(KeySetCache::new(source, 300, 16)));

    let outcome = engine
        .authorize_user_for_operation(&sign(&valid_claims(ISSUER, "")), &NO_SCOPES)
        .await
        .unwrap();
    assert_eq!(outcome.principal().id, USER);
}

#[tokio::test]
async fn test_alg_none_token_is_rejected_without_fetch() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    let (engine, source) = fixture_engine();
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT","kid":"primary-key"}"#);
    let payload = URL_SAFE_NO_PAD.encode(valid_claims(ISSUER, "delete:image").to_string());
    let token = format!("{}.{}.", header, payload);

    let err = engine
        .authorize_user_for_operation(&token, &["delete:image"])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenParse(_)), "got {:?}", err);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_share_one_fetch() {
    let source = Arc::new(FixtureKeySource::slow(std::time::Duration::from_millis(50)));
    let key_sets = Arc::new(KeySetCache::new(source.clone(), 300, 16));
    let engine = Arc::new(AuthorizationEngine::new(auth_config(ISSUER), key_sets));
    let token = sign(&valid_claims(ISSUER, "read:image"));

    let mut requests = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let token = token.clone();
        requests.spawn(async move {
            engine.authorize_user_for_operation(&token, &["read:image"]).await
        });
    }
    while let Some(joined) = requests.join_next().await {
        assert!(joined.unwrap().unwrap().is_authorized());
    }
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_unknown_kids_do_not_refetch_within_refresh_window() {
    let (engine, source) = fixture_engine();
    engine
        .authorize_user_for_operation(&sign(&valid_claims(ISSUER, "")), &NO_SCOPES)
        .await
        .unwrap();

    for n in 0..10 {
        let kid = format!("junk-{}", n);
        let token = sign_with(&valid_claims(ISSUER, ""), ROGUE_KEY_PEM, &kid);
        let err = engine
            .authorize_user_for_operation(&token, &NO_SCOPES)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::KeyNotFound(kid));
    }
    // warm-up plus the single refresh the first junk kid was allowed
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_es256_token_granted_when_configured() {
    let source = Arc::new(FixtureKeySource::default());
    let mut config = auth_config(ISSUER);
    config.algorithms = vec![jsonwebtoken::Algorithm::RS256, jsonwebtoken::Algorithm::ES256];
    let engine = AuthorizationEngine::new(config, Arc::new(KeySetCache::new(source, 300, 16)));

    let outcome = engine
        .authorize_user_for_operation(&sign_es256(&valid_claims(ISSUER, "open:image")), &["open:image"])
        .await
        .unwrap();
    assert_eq!(outcome, AuthOutcome::Granted(Principal::new(USER, TENANT)));
}
