//! Kick public API client library.
//!
//! [`KickClient`] is the entry point. It authenticates itself and exposes one method per
//! supported endpoint, plus [`KickClient::request`] for endpoints that have no typed wrapper.
//!
//! # Authentication modes
//!
//! The mode is fixed by the [`crate::ClientConfig`] the client is built from:
//!
//! - **Bot mode** (no redirect URI): the client uses the client-credentials grant and acquires
//!   tokens on demand. Nothing else is needed before making requests.
//! - **User mode** (redirect URI set): the caller sends the user to
//!   [`KickClient::authorization_url`] and hands the code that comes back to
//!   [`KickClient::exchange_code`]. Requests made before that fail with
//!   [`crate::Error::AuthenticationRequired`].
//!
//! In both modes an expiring token is refreshed before use, and concurrent requests share a
//! single refresh.
//!
//! # Responses
//!
//! Kick wraps results in a `{"data": ..., "message": ...}` envelope. The typed methods return the
//! `data` part; [`KickClient::request`] returns the whole body.

pub mod categories;
pub mod channels;
pub mod chat;
pub mod client;
pub mod livestreams;
pub mod tokens;
pub mod types;

pub use categories::Category;
pub use channels::{Channel, ChannelFilter, ChannelLookup, ChannelStream, ChannelUpdate};
pub use chat::{ChatMessage, ChatMessageType, PostedChatMessage};
pub use client::{KickClient, RequestOptions};
pub use livestreams::{Livestream, LivestreamQuery, LivestreamSort};
pub use tokens::TokenIntrospection;
pub use types::ApiResponse;
