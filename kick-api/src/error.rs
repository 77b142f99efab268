//! Error taxonomy for the Kick API client.
//!
//! Every failure surfaced by this crate is an [`Error`]. Callers branch on [`Error::kind`] (or
//! match the variants directly): a rate-limited call exposes the provider's retry hint through
//! [`Error::retry_after`], an unauthorized call in user mode means the authorization-code flow
//! has to be run again, and so on.

use http::{HeaderMap, StatusCode, header::RETRY_AFTER};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Placeholder used when a failed response's body could not be read at all.
const UNREADABLE_BODY: &str = "Unknown error";

/// The body of a failed HTTP response, parsed on a best-effort basis.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The body was valid JSON.
    Json(serde_json::Value),
    /// The body was readable, but not JSON.
    Text(String),
    /// The body could not be read.
    Unreadable,
}

impl ResponseBody {
    pub(crate) async fn read(response: reqwest::Response) -> Self {
        match response.text().await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(json) => ResponseBody::Json(json),
                Err(_) => ResponseBody::Text(text),
            },
            Err(e) => {
                tracing::trace!(error = %e, "could not read error response body");
                ResponseBody::Unreadable
            }
        }
    }

    /// The human-readable message the provider attached to the failure, if there is one.
    ///
    /// Kick's resource endpoints use `message`, the token endpoint uses the OAuth
    /// `error_description`/`error` pair.
    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(json) => ["message", "error_description", "error"]
                .into_iter()
                .find_map(|key| json.get(key).and_then(serde_json::Value::as_str)),
            ResponseBody::Text(text) if !text.trim().is_empty() => Some(text.trim()),
            ResponseBody::Text(_) => None,
            ResponseBody::Unreadable => Some(UNREADABLE_BODY),
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(json) => write!(f, "{json}"),
            ResponseBody::Text(text) => f.write_str(text),
            ResponseBody::Unreadable => f.write_str(UNREADABLE_BODY),
        }
    }
}

/// Everything we know about a non-success response from the API or the token endpoint.
#[derive(Debug, Clone)]
pub struct ApiFailure {
    pub status: StatusCode,
    /// The endpoint path the request was sent to, e.g. `/public/v1/chat`.
    pub endpoint: String,
    pub body: ResponseBody,
    pub headers: HeaderMap,
}

impl ApiFailure {
    pub(crate) async fn from_response(
        endpoint: impl Into<String>,
        response: reqwest::Response,
    ) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = ResponseBody::read(response).await;
        Self {
            status,
            endpoint: endpoint.into(),
            body,
            headers,
        }
    }

    /// The `retry-after` hint, in whole seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        let value = self.headers.get(RETRY_AFTER)?.to_str().ok()?;
        value.trim().parse().ok().map(Duration::from_secs)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.status, self.endpoint)?;
        if let Some(message) = self.body.message() {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// Classification tag of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    AuthenticationRequired,
    OAuth,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimit,
    Server,
    Api,
    Network,
}

/// An error produced by the Kick API client.
///
/// `Error` is cheap to clone so that a single failed token acquisition can be reported to every
/// caller that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The client was configured in a way that does not support the requested operation.
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// No usable token exists and the client cannot obtain one on its own.
    ///
    /// In user mode this means the authorization-code exchange must be (re-)run.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// The authorization server rejected a token request.
    #[error("OAuth token request failed: {0}")]
    OAuth(Box<ApiFailure>),

    /// The request was rejected, either locally before being sent or by the API with a 400.
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        failure: Option<Box<ApiFailure>>,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(Box<ApiFailure>),

    #[error("forbidden: {0}")]
    Forbidden(Box<ApiFailure>),

    /// The API answered 404, or a lookup returned no matching resource.
    #[error("not found: {message}")]
    NotFound {
        message: String,
        failure: Option<Box<ApiFailure>>,
    },

    #[error("rate limited: {failure}")]
    RateLimit {
        retry_after: Option<Duration>,
        failure: Box<ApiFailure>,
    },

    #[error("server error: {0}")]
    Server(Box<ApiFailure>),

    /// A non-success status with no more specific classification.
    #[error("API request failed: {0}")]
    Api(Box<ApiFailure>),

    /// The HTTP exchange failed (DNS, connection refused, timeout, ...), or a success response
    /// could not be understood.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
            failure: None,
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            failure: None,
        }
    }

    pub(crate) fn network(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Network {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Classifies a failed resource request by its status code.
    pub(crate) fn from_failure(failure: ApiFailure) -> Self {
        let message = || {
            failure
                .body
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| failure.status.to_string())
        };
        match failure.status.as_u16() {
            400 => Error::BadRequest {
                message: message(),
                failure: Some(Box::new(failure)),
            },
            401 => Error::Unauthorized(Box::new(failure)),
            403 => Error::Forbidden(Box::new(failure)),
            404 => Error::NotFound {
                message: message(),
                failure: Some(Box::new(failure)),
            },
            429 => Error::RateLimit {
                retry_after: failure.retry_after(),
                failure: Box::new(failure),
            },
            500..=599 => Error::Server(Box::new(failure)),
            _ => Error::Api(Box::new(failure)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::AuthenticationRequired(_) => ErrorKind::AuthenticationRequired,
            Error::OAuth(_) => ErrorKind::OAuth,
            Error::BadRequest { .. } => ErrorKind::BadRequest,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RateLimit { .. } => ErrorKind::RateLimit,
            Error::Server(_) => ErrorKind::Server,
            Error::Api(_) => ErrorKind::Api,
            Error::Network { .. } => ErrorKind::Network,
        }
    }

    /// The response details, for errors that came back from the server.
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Error::OAuth(failure)
            | Error::Unauthorized(failure)
            | Error::Forbidden(failure)
            | Error::Server(failure)
            | Error::Api(failure)
            | Error::RateLimit { failure, .. } => Some(failure),
            Error::BadRequest { failure, .. } | Error::NotFound { failure, .. } => {
                failure.as_deref()
            }
            Error::Configuration(_)
            | Error::AuthenticationRequired(_)
            | Error::Network { .. } => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.failure().map(|failure| failure.status)
    }

    pub fn body(&self) -> Option<&ResponseBody> {
        self.failure().map(|failure| &failure.body)
    }

    /// How long the provider asked us to wait before retrying. Only set for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn failure(status: u16, body: ResponseBody) -> ApiFailure {
        ApiFailure {
            status: StatusCode::from_u16(status).unwrap(),
            endpoint: "/public/v1/channels".to_string(),
            body,
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn status_codes_map_to_kinds() {
        let cases = [
            (400, ErrorKind::BadRequest),
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Forbidden),
            (404, ErrorKind::NotFound),
            (429, ErrorKind::RateLimit),
            (500, ErrorKind::Server),
            (503, ErrorKind::Server),
            (418, ErrorKind::Api),
            (302, ErrorKind::Api),
        ];
        for (status, kind) in cases {
            let err = Error::from_failure(failure(status, ResponseBody::Unreadable));
            assert_eq!(err.kind(), kind, "status {status}");
            assert_eq!(err.status().map(|s| s.as_u16()), Some(status));
        }
    }

    #[test]
    fn rate_limit_carries_retry_hint() {
        let mut f = failure(429, ResponseBody::Text("slow down".into()));
        f.headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        let err = Error::from_failure(f);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));

        // http-date form is not understood, and that is not an error
        let mut f = failure(429, ResponseBody::Unreadable);
        f.headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        let err = Error::from_failure(f);
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn bad_request_uses_provider_message() {
        let body = ResponseBody::Json(serde_json::json!({"message": "invalid category"}));
        let err = Error::from_failure(failure(400, body));
        assert_eq!(err.to_string(), "bad request: invalid category");
        assert!(err.body().is_some());
    }

    #[test]
    fn body_messages() {
        let json = ResponseBody::Json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "refresh token expired",
        }));
        assert_eq!(json.message(), Some("refresh token expired"));
        assert_eq!(ResponseBody::Text("  ".into()).message(), None);
        assert_eq!(ResponseBody::Unreadable.message(), Some("Unknown error"));
        assert_eq!(ResponseBody::Unreadable.to_string(), "Unknown error");
    }

    #[test]
    fn local_errors_have_no_response() {
        let err = Error::bad_request("content is required");
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.status(), None);
        assert_eq!(err.retry_after(), None);

        let err = Error::network(
            "send GET request",
            std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        );
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(std::error::Error::source(&err).is_some());
    }
}
