//! Access-token lifecycle: caching, validation, refresh, and coalesced acquisition.

use crate::config::{AuthMode, ClientConfig};
use crate::error::{Error, Result};
use crate::oauth::{OAuthManager, Token};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use oauth2::AccessToken;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// An acquisition in progress. Every waiter polls the same underlying future.
type PendingToken = Shared<BoxFuture<'static, Result<Token>>>;

/// Owns the client's current token and hands out access values that are valid right now.
///
/// At most one acquisition (refresh or new grant) is in flight at any time. Callers that ask for
/// a token while one is in flight wait for that acquisition and all see its outcome, success or
/// failure.
#[derive(Debug, Clone)]
pub(crate) struct CredentialManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: Arc<ClientConfig>,
    oauth: OAuthManager,
    state: Mutex<TokenState>,
}

#[derive(Default)]
struct TokenState {
    token: Option<Token>,
    in_flight: Option<PendingToken>,
    /// Bumped whenever a token is stored from outside an acquisition.
    generation: u64,
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("token", &self.token)
            .field("in_flight", &self.in_flight.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

impl CredentialManager {
    pub(crate) fn new(config: Arc<ClientConfig>, oauth: OAuthManager) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                oauth,
                state: Mutex::new(TokenState::default()),
            }),
        }
    }

    /// Returns an access token that is valid for at least another minute.
    ///
    /// Uses the cached token when possible. Otherwise joins the acquisition already in flight, or
    /// starts one if there is none.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    pub(crate) async fn access_token(&self) -> Result<AccessToken> {
        let pending = {
            let mut state = self.inner.state.lock().await;
            if let Some(pending) = &state.in_flight {
                tracing::trace!("joining in-flight token acquisition");
                pending.clone()
            } else if let Some(token) = state.token.as_ref().filter(|token| token.is_valid()) {
                tracing::trace!("using cached access token");
                return Ok(token.access_token().clone());
            } else {
                tracing::debug!("no valid access token cached, starting acquisition");
                let pending = Inner::acquire(Arc::clone(&self.inner), state.generation)
                    .boxed()
                    .shared();
                state.in_flight = Some(pending.clone());
                pending
            }
        };

        let token = pending.await?;
        Ok(token.access_token().clone())
    }

    /// Replaces the cached token wholesale.
    ///
    /// An acquisition still in flight is detached: its waiters get its outcome, but it no longer
    /// overwrites the cache, and new callers see the stored token.
    pub(crate) async fn store(&self, token: Token) {
        let mut state = self.inner.state.lock().await;
        state.token = Some(token);
        state.in_flight = None;
        state.generation += 1;
    }

    /// A snapshot of the cached token, valid or not.
    pub(crate) async fn current(&self) -> Option<Token> {
        self.inner.state.lock().await.token.clone()
    }
}

impl Inner {
    /// Runs one acquisition to completion and publishes its result.
    ///
    /// This is the body of the shared future, so it runs once no matter how many callers await
    /// it.
    async fn acquire(self: Arc<Self>, generation: u64) -> Result<Token> {
        let result = self.obtain().await;

        let mut state = self.state.lock().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "token acquisition failed");
        }
        if state.generation != generation {
            tracing::debug!("token was replaced during acquisition, discarding result");
            return result;
        }
        state.in_flight = None;
        if let Ok(token) = &result {
            state.token = Some(token.clone());
        }
        result
    }

    /// Refresh if we can, otherwise fall back to the grant this client's mode allows.
    async fn obtain(&self) -> Result<Token> {
        let previous = self.state.lock().await.token.clone();

        let mut refresh_error = None;
        if let Some(previous) = previous
            && let Some(refresh_token) = previous.refresh_token()
        {
            tracing::debug!("refreshing access token");
            match self.oauth.refresh(Some(refresh_token)).await {
                Ok(token) => return Ok(token),
                Err(e) => {
                    tracing::warn!(error = %e, "access token refresh failed");
                    refresh_error = Some(e);
                }
            }
        }

        match self.config.auth_mode() {
            AuthMode::ClientCredentials => {
                if refresh_error.is_some() {
                    tracing::debug!("falling back to client credentials");
                }
                self.oauth.client_credentials().await
            }
            AuthMode::AuthorizationCode => Err(match refresh_error {
                Some(e) => Error::AuthenticationRequired(format!(
                    "token refresh failed ({e}); complete the authorization code exchange again"
                )),
                None => Error::AuthenticationRequired(
                    "no user token available; complete the authorization code exchange first"
                        .to_string(),
                ),
            }),
        }
    }
}
