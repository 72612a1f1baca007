//! Checks against a running RequestWave deployment.
//!
//! Run with `cargo test -p api -- --ignored` after exporting
//! `REQUESTWAVE_BASE_URL`, `REQUESTWAVE_EMAIL` and `REQUESTWAVE_PASSWORD`.

use api::{ApiRequest, ClientConfig, Credentials, Endpoint, RequestWaveClient};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(30);

fn make_client() -> RequestWaveClient {
    let base_url =
        std::env::var("REQUESTWAVE_BASE_URL").expect("REQUESTWAVE_BASE_URL must be set");
    RequestWaveClient::new(
        ClientConfig::default()
            .with_base_url(base_url)
            .with_timeout(TIMEOUT),
    )
    .expect("client creation")
}

fn credentials() -> Credentials {
    Credentials::new(
        std::env::var("REQUESTWAVE_EMAIL").expect("REQUESTWAVE_EMAIL must be set"),
        std::env::var("REQUESTWAVE_PASSWORD").expect("REQUESTWAVE_PASSWORD must be set"),
    )
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = make_client();
    client.health().await.expect("health check failed");
}

#[tokio::test]
#[ignore]
async fn test_login_returns_token_and_musician() {
    let client = make_client();
    let auth = client.login(&credentials()).await.expect("login failed");

    assert!(!auth.token.is_empty(), "token must not be empty");
    let musician = auth.musician.expect("musician must be present");
    assert!(!musician.id.is_empty(), "musician id must not be empty");
}

#[tokio::test]
#[ignore]
async fn test_protected_endpoint_requires_token() {
    let client = make_client();
    let response = client
        .send(ApiRequest::get(Endpoint::Songs))
        .await
        .expect("request failed");

    assert!(
        matches!(response.status, 401 | 403),
        "expected 401/403, got {}",
        response.status
    );
}

#[tokio::test]
#[ignore]
async fn test_songs_listing_with_token() {
    let client = make_client();
    let auth = client.login(&credentials()).await.expect("login failed");

    let response = client
        .send(ApiRequest::get(Endpoint::Songs).with_token(auth.token))
        .await
        .expect("request failed");

    assert_eq!(response.status, 200, "body: {}", response.raw);
    assert!(
        response.list(&["songs"]).is_some(),
        "songs response must contain a list, got {}",
        response.raw
    );
}
