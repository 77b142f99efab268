//! OAuth 2.1 token acquisition against the Kick authorization server.
//!
//! This module knows how to talk to the token endpoint (client credentials, authorization code
//! with PKCE, and refresh) and how to build the URL a user visits to approve access. It does not
//! decide *when* to acquire a token; that is the job of the credential manager.

use crate::config::{ClientConfig, join_url};
use crate::error::{ApiFailure, Error, Result};
use jiff::{SignedDuration, Timestamp};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AccessToken, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, HttpRequest, HttpResponse, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use reqwest::Url;
use futures::FutureExt;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub(crate) const AUTHORIZE_PATH: &str = "/oauth/authorize";
pub(crate) const TOKEN_PATH: &str = "/oauth/token";

/// Scopes requested when the caller does not name any.
pub const DEFAULT_SCOPES: &[&str] = &["public"];

/// A token is only handed out if it stays valid for at least this long.
///
/// Absorbs clock skew and the latency of the request the token is about to be used for.
const EXPIRY_MARGIN: SignedDuration = SignedDuration::from_secs(60);

/// Lifetime assumed when the token endpoint does not say.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Form fields whose values never appear in debug traces.
const REDACTED_FIELDS: &[&str] = &["client_secret", "code", "code_verifier", "refresh_token"];

/// An OAuth client that only knows the token endpoint.
type TokenClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// A bearer credential and what we know about it.
///
/// The expiry instant is fixed when the token is received and never recomputed; a refresh
/// produces a whole new `Token`.
#[derive(Debug, Clone)]
pub struct Token {
    access_token: AccessToken,
    token_type: String,
    expires_in: Duration,
    refresh_token: Option<RefreshToken>,
    scope: Option<String>,
    expires_at: Timestamp,
}

impl Token {
    fn issued_at(response: BasicTokenResponse, now: Timestamp) -> Self {
        let expires_in = response.expires_in().unwrap_or(DEFAULT_LIFETIME);
        let lifetime = SignedDuration::try_from(expires_in).unwrap_or(SignedDuration::MAX);
        let scope = response.scopes().map(|scopes| {
            scopes
                .iter()
                .map(|scope| scope.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });
        Self {
            access_token: response.access_token().clone(),
            token_type: AsRef::<str>::as_ref(response.token_type()).to_string(),
            expires_in,
            refresh_token: response.refresh_token().cloned(),
            scope,
            expires_at: now.checked_add(lifetime).unwrap_or(Timestamp::MAX),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            access_token: AccessToken::new(access_token.to_string()),
            token_type: "bearer".to_string(),
            expires_in: DEFAULT_LIFETIME,
            refresh_token: refresh_token.map(|r| RefreshToken::new(r.to_string())),
            scope: None,
            expires_at,
        }
    }

    /// Keeps `previous` as the refresh token if the server did not rotate it.
    pub(crate) fn or_refresh_token(mut self, previous: RefreshToken) -> Self {
        if self.refresh_token.is_none() {
            tracing::trace!("new token lacks refresh token, keeping the previous one");
            self.refresh_token = Some(previous);
        }
        self
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// As reported by the server, usually `Bearer`.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// The lifetime the server granted, as reported at issue time.
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    /// Space-separated scopes the server granted, if it told us.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Whether the token can still be used to start a request at `now`.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        match self.expires_at.checked_sub(EXPIRY_MARGIN) {
            Ok(usable_until) => now < usable_until,
            Err(_) => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Timestamp::now())
    }
}

/// Single-use PKCE parameters for one run of the authorization-code flow.
///
/// Generate one with [`AuthorizationParams::new`], send the user to the URL from
/// [`crate::KickClient::authorization_url`], then hand these same parameters to
/// [`crate::KickClient::exchange_code`]. The exchange takes them by value, so a set of parameters
/// cannot be redeemed twice. Checking the `state` that comes back on the redirect against
/// [`AuthorizationParams::state`] is up to the caller.
#[derive(Debug)]
pub struct AuthorizationParams {
    verifier: PkceCodeVerifier,
    challenge: PkceCodeChallenge,
    state: CsrfToken,
}

impl AuthorizationParams {
    /// Fresh random verifier (S256 challenge) and anti-forgery state.
    pub fn new() -> Self {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        Self {
            verifier,
            challenge,
            state: CsrfToken::new_random(),
        }
    }

    pub fn code_challenge(&self) -> &str {
        self.challenge.as_str()
    }

    pub fn code_challenge_method(&self) -> &str {
        self.challenge.method().as_str()
    }

    pub fn state(&self) -> &str {
        self.state.secret()
    }

    pub(crate) fn verifier(&self) -> &PkceCodeVerifier {
        &self.verifier
    }
}

impl Default for AuthorizationParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the URL that starts the authorization-code flow.
///
/// An empty `scopes` requests [`DEFAULT_SCOPES`].
pub(crate) fn authorization_url(
    config: &ClientConfig,
    params: &AuthorizationParams,
    scopes: &[&str],
) -> Result<Url> {
    let Some(redirect_uri) = config.redirect_uri() else {
        return Err(Error::Configuration(
            "authorization URLs require a redirect_uri; this client uses client credentials"
                .to_string(),
        ));
    };

    let auth_url = AuthUrl::new(join_url(config.auth_base(), AUTHORIZE_PATH))
        .map_err(|e| Error::Configuration(format!("construct authorization URL: {e}")))?;
    let redirect_url = RedirectUrl::new(redirect_uri.to_string())
        .map_err(|e| Error::Configuration(format!("invalid redirect_uri: {e}")))?;
    let client = BasicClient::new(ClientId::new(config.client_id().to_string()))
        .set_auth_uri(auth_url)
        .set_redirect_uri(redirect_url);

    let scopes = if scopes.is_empty() {
        DEFAULT_SCOPES
    } else {
        scopes
    };
    let (url, _state) = client
        .authorize_url(|| params.state.clone())
        .add_scopes(scopes.iter().map(|scope| Scope::new(scope.to_string())))
        .set_pkce_challenge(params.challenge.clone())
        .url();

    Ok(url)
}

/// The grant-specific half of a token request.
enum Grant<'a> {
    ClientCredentials,
    AuthorizationCode {
        code: &'a str,
        verifier: &'a PkceCodeVerifier,
        redirect_uri: RedirectUrl,
    },
    RefreshToken(&'a RefreshToken),
}

impl Grant<'_> {
    fn as_str(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }
}

/// Why the HTTP leg of a token request did not produce a usable response.
#[derive(Debug, thiserror::Error)]
enum TokenHttpError {
    #[error("token endpoint answered {}", .0.status)]
    Rejected(Box<ApiFailure>),
    #[error(transparent)]
    Transport(reqwest::Error),
}

/// Renders a form-encoded token request body with secret values blanked out.
fn redacted(body: &[u8]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(body) {
        if REDACTED_FIELDS.contains(&key.as_ref()) {
            serializer.append_pair(&key, "[redacted]");
        } else {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.finish()
}

/// Performs token requests on behalf of one client.
#[derive(Debug, Clone)]
pub(crate) struct OAuthManager {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
}

impl OAuthManager {
    pub(crate) fn new(config: Arc<ClientConfig>, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Obtains a token for the application itself.
    #[instrument(skip(self))]
    pub(crate) async fn client_credentials(&self) -> Result<Token> {
        self.request_token(Grant::ClientCredentials).await
    }

    /// Redeems an authorization code using the PKCE verifier it was requested with.
    #[instrument(skip_all)]
    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        verifier: &PkceCodeVerifier,
    ) -> Result<Token> {
        let Some(redirect_uri) = self.config.redirect_uri() else {
            return Err(Error::Configuration(
                "exchanging an authorization code requires a redirect_uri".to_string(),
            ));
        };
        let redirect_uri = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| Error::Configuration(format!("invalid redirect_uri: {e}")))?;
        self.request_token(Grant::AuthorizationCode {
            code,
            verifier,
            redirect_uri,
        })
        .await
    }

    /// Trades a refresh token for a new token.
    ///
    /// If the server does not rotate the refresh token, the one we sent is kept.
    #[instrument(skip_all)]
    pub(crate) async fn refresh(&self, refresh_token: Option<&RefreshToken>) -> Result<Token> {
        let Some(refresh_token) = refresh_token else {
            return Err(Error::AuthenticationRequired(
                "no refresh token is stored".to_string(),
            ));
        };
        let token = self
            .request_token(Grant::RefreshToken(refresh_token))
            .await?;
        Ok(token.or_refresh_token(refresh_token.clone()))
    }

    fn token_client(&self) -> Result<TokenClient> {
        let token_url = TokenUrl::new(join_url(self.config.auth_base(), TOKEN_PATH))
            .map_err(|e| Error::Configuration(format!("construct token URL: {e}")))?;
        Ok(BasicClient::new(ClientId::new(self.config.client_id().to_string()))
            .set_client_secret(ClientSecret::new(self.config.client_secret().to_string()))
            // Kick expects the client credentials in the form body, not in a Basic header.
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url))
    }

    async fn request_token(&self, grant: Grant<'_>) -> Result<Token> {
        let client = self.token_client()?;
        let this = self.clone();
        let send = move |request: HttpRequest| {
            let this = this.clone();
            async move { this.send(request).await }
        };

        let response = match &grant {
            Grant::ClientCredentials => {
                client
                    .exchange_client_credentials()
                    .request_async(&send)
                    .boxed()
                    .await
            }
            Grant::AuthorizationCode {
                code,
                verifier,
                redirect_uri,
            } => {
                client
                    .exchange_code(AuthorizationCode::new(code.to_string()))
                    .set_pkce_verifier(PkceCodeVerifier::new(verifier.secret().clone()))
                    .set_redirect_uri(Cow::Borrowed(redirect_uri))
                    .request_async(&send)
                    .boxed()
                    .await
            }
            Grant::RefreshToken(refresh_token) => {
                client
                    .exchange_refresh_token(refresh_token)
                    .request_async(&send)
                    .boxed()
                    .await
            }
        };

        let response = response.map_err(|e| match e {
            RequestTokenError::Request(TokenHttpError::Rejected(failure)) => Error::OAuth(failure),
            RequestTokenError::Request(TokenHttpError::Transport(e)) => {
                Error::network(format!("send {} token request", grant.as_str()), e)
            }
            other => Error::network("token endpoint sent an unusable response", other),
        })?;
        let token = Token::issued_at(response, Timestamp::now());

        tracing::debug!(
            grant_type = grant.as_str(),
            expires_at = %token.expires_at,
            has_refresh_token = token.refresh_token.is_some(),
            "obtained access token"
        );
        Ok(token)
    }

    /// Carries a token request built by `oauth2` over this client's connection pool.
    ///
    /// Non-success responses become an [`ApiFailure`] here, before `oauth2` gets to parse them,
    /// so the status and the raw body survive into [`Error::OAuth`].
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TokenHttpError> {
        let debug = self.config.debug();
        if debug {
            tracing::debug!(
                url = %request.uri(),
                body = %redacted(request.body()),
                "sending token request"
            );
        }

        let request = reqwest::Request::try_from(request).map_err(TokenHttpError::Transport)?;
        let response = self
            .http
            .execute(request)
            .await
            .map_err(TokenHttpError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let failure = ApiFailure::from_response(TOKEN_PATH, response).await;
            if debug {
                tracing::debug!(%status, body = %failure.body, "token request failed");
            }
            return Err(TokenHttpError::Rejected(Box::new(failure)));
        }

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(TokenHttpError::Transport)?;
        let mut http_response = HttpResponse::new(body.to_vec());
        *http_response.status_mut() = status;
        *http_response.headers_mut() = headers;
        Ok(http_response)
    }
}
