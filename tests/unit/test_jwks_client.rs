// HTTP key-set retrieval against a mock issuer

use gacha_api::auth::engine::AuthorizationEngine;
use gacha_api::auth::jwks::{JwksClient, KeySetSource};
use gacha_api::core::errors::AuthError;
use gacha_api::state::key_set_cache::KeySetCache;
use std::sync::Arc;

use super::common::*;

const JWKS_PATH: &str = "/.well-known/jwks.json";

fn issuer_url(server: &mockito::ServerGuard) -> String {
    format!("{}/", server.url())
}

fn http_engine(issuer: &str, ttl_secs: u64) -> AuthorizationEngine {
    let client = JwksClient::new(2).unwrap();
    let key_sets = Arc::new(KeySetCache::new(Arc::new(client), ttl_secs, 16));
    AuthorizationEngine::new(auth_config(issuer), key_sets)
}

#[tokio::test]
async fn test_fetches_and_parses_published_keys() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", JWKS_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(JWKS_FIXTURE)
        .expect(1)
        .create_async()
        .await;

    let client = JwksClient::new(2).unwrap();
    let key_set = client.fetch_key_set(&issuer_url(&server)).await.unwrap();
    assert_eq!(key_set.kids(), vec![EC_KID, PRIMARY_KID]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_200_is_key_set_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", JWKS_PATH)
        .with_status(503)
        .create_async()
        .await;

    let client = JwksClient::new(2).unwrap();
    let err = client.fetch_key_set(&issuer_url(&server)).await.unwrap_err();
    assert!(matches!(err, AuthError::KeySetUnavailable(_)));
}

#[tokio::test]
async fn test_invalid_document_is_key_set_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", JWKS_PATH)
        .with_status(200)
        .with_body("{\"not\": \"a key set\"}")
        .create_async()
        .await;

    let client = JwksClient::new(2).unwrap();
    let err = client.fetch_key_set(&issuer_url(&server)).await.unwrap_err();
    assert!(matches!(err, AuthError::KeySetUnavailable(_)));
}

#[tokio::test]
async fn test_unreachable_issuer_is_key_set_unavailable() {
    let client = JwksClient::new(1).unwrap();
    let err = client.fetch_key_set("http://127.0.0.1:9/").await.unwrap_err();
    assert!(matches!(err, AuthError::KeySetUnavailable(_)));
}

#[tokio::test]
async fn test_engine_end_to_end_over_http() {
    let mut server = mockito::Server::new_async().await;
    let issuer = issuer_url(&server);
    let mock = server
        .mock("GET", JWKS_PATH)
        .with_status(200)
        .with_body(JWKS_FIXTURE)
        .expect(1)
        .create_async()
        .await;

    let engine = http_engine(&issuer, 300);
    let token = sign(&valid_claims(&issuer, "create:image read:image"));
    for _ in 0..2 {
        let outcome = engine
            .authorize_user_for_operation(&token, &["create:image"])
            .await
            .unwrap();
        assert_eq!(outcome.into_parts().1.id, USER);
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_zero_ttl_fetches_every_request() {
    let mut server = mockito::Server::new_async().await;
    let issuer = issuer_url(&server);
    let mock = server
        .mock("GET", JWKS_PATH)
        .with_status(200)
        .with_body(JWKS_FIXTURE)
        .expect(2)
        .create_async()
        .await;

    let engine = http_engine(&issuer, 0);
    let token = sign(&valid_claims(&issuer, ""));
    let empty: [&str; 0] = [];
    engine.authorize_user_for_operation(&token, &empty).await.unwrap();
    engine.authorize_user_for_operation(&token, &empty).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unlisted_issuer_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", JWKS_PATH)
        .with_status(200)
        .with_body(JWKS_FIXTURE)
        .expect(0)
        .create_async()
        .await;

    let engine = http_engine(&issuer_url(&server), 300);
    let token = sign(&valid_claims("https://evil.example.com/", "create:image"));
    let err = engine
        .authorize_user_for_operation(&token, &["create:image"])
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidIssuer);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_failure_fails_request_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let issuer = issuer_url(&server);
    let mock = server
        .mock("GET", JWKS_PATH)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let engine = http_engine(&issuer, 300);
    let token = sign(&valid_claims(&issuer, ""));
    let empty: [&str; 0] = [];
    let err = engine.authorize_user_for_operation(&token, &empty).await.unwrap_err();
    assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    mock.assert_async().await;
}
