#![allow(dead_code)]

use kick_api::{ClientConfig, KickClient};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REDIRECT_URI: &str = "http://localhost:3000/callback";

pub fn bot_client(server: &MockServer) -> KickClient {
    let config = ClientConfig::builder()
        .client_id("app-id")
        .client_secret("app-secret")
        .api_base(server.uri())
        .auth_base(server.uri())
        .build()
        .unwrap();
    KickClient::new(config).unwrap()
}

pub fn user_client(server: &MockServer) -> KickClient {
    let config = ClientConfig::builder()
        .client_id("app-id")
        .client_secret("app-secret")
        .redirect_uri(REDIRECT_URI)
        .api_base(server.uri())
        .auth_base(server.uri())
        .build()
        .unwrap();
    KickClient::new(config).unwrap()
}

pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "public chat:write",
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = refresh_token.into();
    }
    body
}

/// Serves a client-credentials token, expecting exactly `times` grants.
pub async fn mount_client_credentials(server: &MockServer, access_token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token, None)))
        .expect(times)
        .mount(server)
        .await;
}
