//! Client for the Kick streaming platform's public API.
//!
//! ```no_run
//! # async fn demo() -> kick_api::Result<()> {
//! let config = kick_api::ClientConfig::from_env()?;
//! let client = kick_api::KickClient::new(config)?;
//! let live = client
//!     .list_livestreams(&kick_api::LivestreamQuery::default())
//!     .await?;
//! for stream in live {
//!     println!("{} ({} viewers)", stream.slug, stream.viewer_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod credentials;
pub mod error;
pub mod kick_api;
pub mod oauth;

pub use config::{AuthMode, ClientConfig, ClientConfigBuilder};
pub use error::{ApiFailure, Error, ErrorKind, ResponseBody, Result};
pub use kick_api::{
    Category, Channel, ChannelFilter, ChannelLookup, ChannelUpdate, ChatMessage, KickClient,
    LivestreamQuery, LivestreamSort, RequestOptions,
};
pub use oauth::{AuthorizationParams, Token};
