//! Client configuration.

use crate::error::Error;
use derive_builder::Builder;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Production location of the Kick public API.
pub const DEFAULT_API_BASE: &str = "https://api.kick.com";
/// Production location of the Kick OAuth authorization server.
pub const DEFAULT_AUTH_BASE: &str = "https://id.kick.com";
/// Upper bound on any single HTTP exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which OAuth flow a client authenticates with.
///
/// Decided once, by whether a redirect URI is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Machine (bot) access via the client-credentials grant. Tokens are obtained on demand.
    ClientCredentials,
    /// User access via authorization code + PKCE. The caller drives the authorization step and
    /// hands the resulting code to [`crate::KickClient::exchange_code`].
    AuthorizationCode,
}

/// Immutable settings for a [`crate::KickClient`].
///
/// ```
/// let config = kick_api::ClientConfig::builder()
///     .client_id("01ABCDEF")
///     .client_secret("s3cr3t")
///     .build()
///     .unwrap();
/// assert_eq!(config.auth_mode(), kick_api::AuthMode::ClientCredentials);
/// ```
#[derive(Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ClientConfig {
    /// The application's client identifier.
    #[builder(setter(into))]
    client_id: String,

    /// The application's client secret.
    #[builder(setter(into))]
    client_secret: String,

    /// Where the authorization server sends the user back to after they approve access.
    ///
    /// Setting this selects [`AuthMode::AuthorizationCode`].
    #[builder(setter(into, strip_option), default)]
    redirect_uri: Option<String>,

    #[builder(setter(into), default = "DEFAULT_API_BASE.to_string()")]
    api_base: String,

    #[builder(setter(into), default = "DEFAULT_AUTH_BASE.to_string()")]
    auth_base: String,

    /// Emit request/response diagnostics for token requests and failed API calls.
    #[builder(default)]
    debug: bool,

    #[builder(default = "DEFAULT_TIMEOUT")]
    timeout: Duration,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Reads the configuration from `KICK_*` environment variables.
    ///
    /// `KICK_CLIENT_ID` and `KICK_CLIENT_SECRET` are required. `KICK_REDIRECT_URI`,
    /// `KICK_API_BASE`, `KICK_AUTH_BASE` and `KICK_DEBUG` are optional.
    pub fn from_env() -> Result<Self, Error> {
        fn required(var: &str) -> Result<String, Error> {
            std::env::var(var)
                .map_err(|_| Error::Configuration(format!("environment variable {var} is not set")))
        }

        let mut builder = Self::builder();
        builder
            .client_id(required("KICK_CLIENT_ID")?)
            .client_secret(required("KICK_CLIENT_SECRET")?);
        if let Ok(redirect_uri) = std::env::var("KICK_REDIRECT_URI") {
            builder.redirect_uri(redirect_uri);
        }
        if let Ok(api_base) = std::env::var("KICK_API_BASE") {
            builder.api_base(api_base);
        }
        if let Ok(auth_base) = std::env::var("KICK_AUTH_BASE") {
            builder.auth_base(auth_base);
        }
        if let Ok(debug) = std::env::var("KICK_DEBUG") {
            builder.debug(matches!(debug.as_str(), "1" | "true" | "yes"));
        }
        Ok(builder.build()?)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn auth_base(&self) -> &str {
        &self.auth_base
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn auth_mode(&self) -> AuthMode {
        if self.redirect_uri.is_some() {
            AuthMode::AuthorizationCode
        } else {
            AuthMode::ClientCredentials
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .field("api_base", &self.api_base)
            .field("auth_base", &self.auth_base)
            .field("debug", &self.debug)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(client_id) = &self.client_id
            && client_id.trim().is_empty()
        {
            return Err("client_id must not be empty".to_string());
        }
        if let Some(client_secret) = &self.client_secret
            && client_secret.trim().is_empty()
        {
            return Err("client_secret must not be empty".to_string());
        }

        let urls = [
            ("redirect_uri", self.redirect_uri.clone().flatten()),
            ("api_base", self.api_base.clone()),
            ("auth_base", self.auth_base.clone()),
        ];
        for (field, url) in urls {
            if let Some(url) = url {
                Url::parse(&url).map_err(|e| format!("{field} {url:?} is not a valid URL: {e}"))?;
            }
        }

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err("timeout must be non-zero".to_string());
        }
        Ok(())
    }
}

impl From<ClientConfigBuilderError> for Error {
    fn from(e: ClientConfigBuilderError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Joins a base location and an absolute endpoint path, tolerating a trailing `/` on the base.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
