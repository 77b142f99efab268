//! Core Kick API client: request dispatch and the typed resource operations.

use crate::config::{ClientConfig, join_url};
use crate::credentials::CredentialManager;
use crate::error::{ApiFailure, Error, Result};
use crate::kick_api::{
    categories::{self, Category},
    channels::{Channel, ChannelFilter, ChannelLookup, ChannelUpdate},
    chat::{ChatMessage, PostedChatMessage},
    livestreams::{Livestream, LivestreamQuery},
    tokens::TokenIntrospection,
    types::ApiResponse,
};
use crate::oauth::{self, AuthorizationParams, OAuthManager, Token};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use oauth2::AccessToken;
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// Per-call additions to a request made through [`KickClient::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query parameter. Repeating a key sends it repeatedly.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn queries(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Sets a header, overriding the client's default for the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| Error::bad_request(format!("serialize request body: {e}")))?;
        self.body = Some(body);
        Ok(self)
    }
}

/// Client for the Kick public API.
///
/// The client obtains and refreshes its own access tokens. In bot mode (no redirect URI) that
/// happens transparently on first use. In user mode the caller must first complete the
/// authorization-code flow through [`KickClient::authorization_url`] and
/// [`KickClient::exchange_code`]; after that the client refreshes the user's token as needed.
///
/// Clones share the same token, so it is fine to hand a clone to every task that needs one.
#[derive(Debug, Clone)]
pub struct KickClient {
    config: Arc<ClientConfig>,
    credentials: CredentialManager,
    oauth: OAuthManager,
    /// HTTP client for API requests
    client: reqwest::Client,
}

impl KickClient {
    /// Creates a client. No network traffic happens until the first call.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = Arc::new(config);
        let client = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("build HTTP client: {e}")))?;
        let oauth = OAuthManager::new(Arc::clone(&config), client.clone());
        let credentials = CredentialManager::new(Arc::clone(&config), oauth.clone());
        Ok(Self {
            config,
            credentials,
            oauth,
            client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns an access token valid for at least another minute, acquiring one if necessary.
    pub async fn access_token(&self) -> Result<AccessToken> {
        self.credentials.access_token().await
    }

    /// A snapshot of the currently cached token, if any.
    pub async fn current_token(&self) -> Option<Token> {
        self.credentials.current().await
    }

    /// Fresh PKCE parameters for one run of the authorization-code flow.
    pub fn authorization_params(&self) -> AuthorizationParams {
        AuthorizationParams::new()
    }

    /// Builds the URL to send a user to so they can grant this application access.
    ///
    /// Passing no scopes requests [`oauth::DEFAULT_SCOPES`]. Fails with a configuration error if
    /// the client has no redirect URI.
    pub fn authorization_url(&self, params: &AuthorizationParams, scopes: &[&str]) -> Result<Url> {
        oauth::authorization_url(&self.config, params, scopes)
    }

    /// Redeems the code the authorization server redirected the user back with.
    ///
    /// The resulting token is cached and used for all later requests. `params` must be the same
    /// parameters the authorization URL was built from.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str, params: AuthorizationParams) -> Result<Token> {
        let token = self.oauth.exchange_code(code, params.verifier()).await?;
        self.credentials.store(token.clone()).await;
        tracing::info!("authorization code exchanged for user token");
        Ok(token)
    }

    /// Makes an authenticated request to the Kick API and parses the JSON response.
    ///
    /// `endpoint` is a path such as `/public/v1/channels`. The default headers (bearer
    /// authorization, JSON accept and content type) can be overridden through `options`.
    /// An empty response body parses as JSON `null`, so `T = ()` works for `204 No Content`.
    ///
    /// Non-success statuses are classified into the [`Error`] variants; nothing is retried.
    #[instrument(skip(self, options), level = tracing::Level::DEBUG)]
    pub async fn request<T>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let access_token = self.credentials.access_token().await?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", access_token.secret()))
            .map_err(|_| {
                Error::AuthenticationRequired(
                    "access token is not a valid header value".to_string(),
                )
            })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        let url = join_url(self.config.api_base(), endpoint);
        let mut request = self.client.request(method.clone(), &url).headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::network(format!("send {method} request to {endpoint}"), e))?;

        let status = response.status();
        if !status.is_success() {
            let failure = ApiFailure::from_response(endpoint, response).await;
            if self.config.debug() {
                tracing::debug!(%status, body = %failure.body, "Kick API request failed");
            }
            return Err(Error::from_failure(failure));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(format!("read response from {endpoint}"), e))?;
        let body: &[u8] = if body.is_empty() { b"null" } else { &body };
        serde_json::from_slice(body)
            .map_err(|e| Error::network(format!("decode response from {endpoint}"), e))
    }

    /// Like [`Self::request`], but unwraps the `data` field of the response envelope.
    async fn request_data<T>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self.request(method, endpoint, options).await?;
        Ok(response.data)
    }

    /// Searches categories by name.
    ///
    /// # Arguments
    ///
    /// * `query` - Search text; must not be blank
    /// * `page` - 1-based results page
    ///
    /// # API Reference
    ///
    /// <https://docs.kick.com/apis/categories>
    #[instrument(skip(self))]
    pub async fn search_categories(&self, query: &str, page: u32) -> Result<Vec<Category>> {
        categories::validate_search(query, page)?;
        let options = RequestOptions::new()
            .query("q", query)
            .query("page", page.to_string());
        let categories: Vec<Category> = self
            .request_data(Method::GET, "/public/v1/categories", options)
            .await?;

        tracing::debug!(returned_items = categories.len(), "searched categories");
        Ok(categories)
    }

    /// Gets a single category by id.
    #[instrument(skip(self))]
    pub async fn get_category(&self, category_id: u64) -> Result<Category> {
        self.request_data(
            Method::GET,
            &format!("/public/v1/categories/{category_id}"),
            RequestOptions::new(),
        )
        .await
    }

    /// Lists channels by broadcaster id or slug, or the authenticated user's own channel.
    ///
    /// # API Reference
    ///
    /// <https://docs.kick.com/apis/channels>
    #[instrument(skip(self))]
    pub async fn list_channels(&self, filter: &ChannelFilter) -> Result<Vec<Channel>> {
        filter.validate()?;
        let options = RequestOptions::new().queries(filter.to_query());
        let channels: Vec<Channel> = self
            .request_data(Method::GET, "/public/v1/channels", options)
            .await?;

        tracing::debug!(returned_items = channels.len(), "fetched channels");
        Ok(channels)
    }

    /// Gets one channel. Fails with [`Error::NotFound`] if Kick returns no match.
    #[instrument(skip(self))]
    pub async fn get_channel(&self, lookup: ChannelLookup) -> Result<Channel> {
        let description = format!("{lookup:?}");
        self.list_channels(&lookup.into())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("channel not found: {description}")))
    }

    /// Updates the authenticated user's channel.
    ///
    /// Requires the `channel:write` scope.
    #[instrument(skip(self), ret)]
    pub async fn update_channel(&self, update: &ChannelUpdate) -> Result<()> {
        update.validate()?;
        let options = RequestOptions::new().json(update)?;
        let _: serde_json::Value = self
            .request(Method::PATCH, "/public/v1/channels", options)
            .await?;

        tracing::debug!("updated channel");
        Ok(())
    }

    /// Lists streams that are live right now.
    ///
    /// # API Reference
    ///
    /// <https://docs.kick.com/apis/livestreams>
    #[instrument(skip(self))]
    pub async fn list_livestreams(&self, query: &LivestreamQuery) -> Result<Vec<Livestream>> {
        query.validate()?;
        let options = RequestOptions::new().queries(query.to_query());
        let livestreams: Vec<Livestream> = self
            .request_data(Method::GET, "/public/v1/livestreams", options)
            .await?;

        tracing::debug!(returned_items = livestreams.len(), "fetched livestreams");
        Ok(livestreams)
    }

    /// Posts a chat message as the user or as the application's bot.
    ///
    /// Requires the `chat:write` scope.
    ///
    /// # API Reference
    ///
    /// <https://docs.kick.com/apis/chat>
    #[instrument(skip(self, message), fields(message_type = ?message.message_type))]
    pub async fn post_chat_message(&self, message: &ChatMessage) -> Result<PostedChatMessage> {
        message.validate()?;
        let options = RequestOptions::new().json(message)?;
        let posted: PostedChatMessage = self
            .request_data(Method::POST, "/public/v1/chat", options)
            .await?;

        tracing::debug!(
            message_id = posted.message_id,
            is_sent = posted.is_sent,
            "posted chat message"
        );
        Ok(posted)
    }

    /// Asks Kick about the token this client is currently using.
    #[instrument(skip(self))]
    pub async fn introspect_token(&self) -> Result<TokenIntrospection> {
        self.request_data(
            Method::POST,
            "/public/v1/token/introspect",
            RequestOptions::new(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn bot_client(server: &MockServer) -> KickClient {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "bot-token",
                "token_type": "Bearer",
                "expires_in": 3600,
            })))
            .mount(server)
            .await;

        let config = ClientConfig::builder()
            .client_id("app-id")
            .client_secret("app-secret")
            .api_base(server.uri())
            .auth_base(server.uri())
            .build()
            .unwrap();
        KickClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn caller_headers_override_defaults() {
        let server = MockServer::start().await;
        let client = bot_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/public/v1/custom"))
            .and(header("authorization", "Bearer bot-token"))
            .and(header("accept", "text/plain"))
            .and(query_param("a", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let options = RequestOptions::new()
            .query("a", "1")
            .header(ACCEPT, HeaderValue::from_static("text/plain"));
        let body: serde_json::Value = client
            .request(Method::GET, "/public/v1/custom", options)
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn empty_success_body_is_null() {
        let server = MockServer::start().await;
        let client = bot_client(&server).await;
        Mock::given(method("PATCH"))
            .and(path("/public/v1/channels"))
            .and(body_json(serde_json::json!({"category_id": 15})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let update = ChannelUpdate {
            category_id: Some(15),
            ..Default::default()
        };
        client.update_channel(&update).await.unwrap();
    }

    #[tokio::test]
    async fn unexpected_success_shape_is_a_network_error() {
        let server = MockServer::start().await;
        let client = bot_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/public/v1/categories/15"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client.get_category(15).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn get_channel_without_match_is_not_found() {
        let server = MockServer::start().await;
        let client = bot_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/public/v1/channels"))
            .and(query_param("slug", "nobody"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": [], "message": "OK"})),
            )
            .mount(&server)
            .await;

        let err = client
            .get_channel(ChannelLookup::Slug("nobody".into()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn livestream_filters_are_sent() {
        let server = MockServer::start().await;
        let client = bot_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/public/v1/livestreams"))
            .and(query_param("category_id", "15"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "broadcaster_user_id": 1,
                    "channel_id": 11,
                    "slug": "first",
                    "stream_title": "hello",
                    "category": {"id": 15, "name": "Just Chatting", "thumbnail": ""},
                    "has_mature_content": false,
                    "language": "en",
                    "started_at": "2025-03-01T18:30:00Z",
                    "thumbnail": "",
                    "viewer_count": 42
                }],
                "message": "OK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = LivestreamQuery {
            category_id: Some(15),
            limit: Some(2),
            ..Default::default()
        };
        let streams = client.list_livestreams(&query).await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].viewer_count, 42);
        assert_eq!(streams[0].slug, "first");
    }
}
