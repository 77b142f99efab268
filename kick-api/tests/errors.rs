mod common;

use common::{bot_client, mount_client_credentials};
use kick_api::{ChannelLookup, ClientConfig, ErrorKind, KickClient, ResponseBody};
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn category_failure(response: ResponseTemplate) -> kick_api::Error {
    let server = MockServer::start().await;
    mount_client_credentials(&server, "bot-token", 1).await;
    Mock::given(method("GET"))
        .and(path("/public/v1/categories/15"))
        .respond_with(response)
        .mount(&server)
        .await;

    bot_client(&server).get_category(15).await.unwrap_err()
}

#[tokio::test]
async fn rate_limit_exposes_retry_after() {
    let err = category_failure(
        ResponseTemplate::new(429)
            .insert_header("retry-after", "30")
            .set_body_json(serde_json::json!({"message": "slow down"})),
    )
    .await;

    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(429));
    assert_eq!(
        err.body(),
        Some(&ResponseBody::Json(
            serde_json::json!({"message": "slow down"})
        ))
    );
}

#[tokio::test]
async fn statuses_map_to_kinds() {
    let cases = [
        (400, ErrorKind::BadRequest),
        (401, ErrorKind::Unauthorized),
        (403, ErrorKind::Forbidden),
        (404, ErrorKind::NotFound),
        (409, ErrorKind::Api),
        (500, ErrorKind::Server),
        (503, ErrorKind::Server),
    ];
    for (status, kind) in cases {
        let err = category_failure(ResponseTemplate::new(status).set_body_string("nope")).await;
        assert_eq!(err.kind(), kind, "status {status}");
        assert_eq!(err.status().map(|s| s.as_u16()), Some(status));
        assert_eq!(err.failure().unwrap().endpoint, "/public/v1/categories/15");
    }
}

#[tokio::test]
async fn not_found_keeps_server_message() {
    let err = category_failure(
        ResponseTemplate::new(404)
            .set_body_json(serde_json::json!({"message": "category does not exist"})),
    )
    .await;

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(
        err.to_string().contains("category does not exist"),
        "{err}"
    );
}

#[tokio::test]
async fn unreachable_api_is_a_network_error() {
    // grab a free port, then close it so connections are refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let server = MockServer::start().await;
    mount_client_credentials(&server, "bot-token", 1).await;
    let config = ClientConfig::builder()
        .client_id("app-id")
        .client_secret("app-secret")
        .auth_base(server.uri())
        .api_base(format!("http://{address}"))
        .build()
        .unwrap();
    let client = KickClient::new(config).unwrap();

    let err = client
        .get_channel(ChannelLookup::BroadcasterId(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn failed_token_grant_is_an_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = bot_client(&server).get_category(15).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OAuth);
    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
}
