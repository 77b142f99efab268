//! Shared response envelope and serde helpers for the Kick API client.

use jiff::Timestamp;
use serde::{Deserialize, Deserializer};

/// Every Kick public API response wraps its payload as `{"data": ..., "message": ...}`.
///
/// The resource methods on [`crate::KickClient`] all unwrap `data` before returning it. Use
/// [`crate::KickClient::request`] with `ApiResponse<T>` to get at `message` as well.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default)]
    pub message: String,
}

/// Reads an optional timestamp, treating `null`, `""` and anything unparseable as absent.
///
/// Offline channels report their stream start as an empty or placeholder value.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| raw.parse().ok()))
}
