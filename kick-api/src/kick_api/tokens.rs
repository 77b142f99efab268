//! Kick token introspection.

use serde::{Deserialize, Serialize};

/// What Kick reports about the access token a request was made with.
///
/// See: <https://docs.kick.com/apis/users#token-introspection>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIntrospection {
    pub active: bool,
    #[serde(default)]
    pub client_id: String,
    /// Expiry as a Unix timestamp in seconds.
    #[serde(default)]
    pub exp: i64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: String,
}
