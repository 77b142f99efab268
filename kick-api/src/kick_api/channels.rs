//! Kick Channels API types.

use crate::error::{Error, Result};
use crate::kick_api::categories::Category;
use crate::kick_api::types::lenient_timestamp;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Maximum number of ids or slugs in one `channels` lookup.
pub const MAX_CHANNEL_LOOKUPS: usize = 50;
/// Longest slug Kick accepts.
pub const MAX_SLUG_LENGTH: usize = 25;
/// Maximum number of custom tags on a channel.
pub const MAX_CUSTOM_TAGS: usize = 10;

/// A Kick channel and, if it has one, its current stream.
///
/// See: <https://docs.kick.com/apis/channels>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub broadcaster_user_id: u64,
    pub slug: String,
    #[serde(default)]
    pub stream_title: String,
    #[serde(default)]
    pub channel_description: String,
    #[serde(default)]
    pub banner_picture: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub stream: Option<ChannelStream>,
}

/// Stream details attached to a [`Channel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStream {
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub is_mature: bool,
    #[serde(default)]
    pub language: String,
    /// When the current (or last) stream started. Absent for channels that never went live.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub viewer_count: u64,
}

/// Which channels `list_channels` should return.
///
/// Kick does not allow mixing ids and slugs in a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFilter {
    /// The channel belonging to the authenticated user.
    Authenticated,
    BroadcasterIds(Vec<u64>),
    Slugs(Vec<String>),
}

impl ChannelFilter {
    pub(crate) fn validate(&self) -> Result<()> {
        let count = match self {
            ChannelFilter::Authenticated => return Ok(()),
            ChannelFilter::BroadcasterIds(ids) => ids.len(),
            ChannelFilter::Slugs(slugs) => {
                if let Some(slug) = slugs
                    .iter()
                    .find(|slug| slug.is_empty() || slug.chars().count() > MAX_SLUG_LENGTH)
                {
                    return Err(Error::bad_request(format!(
                        "channel slug {slug:?} must be 1 to {MAX_SLUG_LENGTH} characters"
                    )));
                }
                slugs.len()
            }
        };
        if count == 0 {
            return Err(Error::bad_request(
                "channel lookup needs at least one id or slug",
            ));
        }
        if count > MAX_CHANNEL_LOOKUPS {
            return Err(Error::bad_request(format!(
                "channel lookup is limited to {MAX_CHANNEL_LOOKUPS} ids or slugs, got {count}"
            )));
        }
        Ok(())
    }

    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        match self {
            ChannelFilter::Authenticated => Vec::new(),
            ChannelFilter::BroadcasterIds(ids) => ids
                .iter()
                .map(|id| ("broadcaster_user_id".to_string(), id.to_string()))
                .collect(),
            ChannelFilter::Slugs(slugs) => slugs
                .iter()
                .map(|slug| ("slug".to_string(), slug.clone()))
                .collect(),
        }
    }
}

/// Identifies a single channel for `get_channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLookup {
    BroadcasterId(u64),
    Slug(String),
}

impl From<ChannelLookup> for ChannelFilter {
    fn from(lookup: ChannelLookup) -> Self {
        match lookup {
            ChannelLookup::BroadcasterId(id) => ChannelFilter::BroadcasterIds(vec![id]),
            ChannelLookup::Slug(slug) => ChannelFilter::Slugs(vec![slug]),
        }
    }
}

/// Changes to apply to the authenticated user's channel. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_title: Option<String>,
    /// Replaces the channel's custom tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_tags: Option<Vec<String>>,
}

impl ChannelUpdate {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.category_id.is_none() && self.stream_title.is_none() && self.custom_tags.is_none()
        {
            return Err(Error::bad_request("channel update does not change anything"));
        }
        if let Some(title) = &self.stream_title
            && title.trim().is_empty()
        {
            return Err(Error::bad_request("stream title must not be empty"));
        }
        if let Some(tags) = &self.custom_tags
            && tags.len() > MAX_CUSTOM_TAGS
        {
            return Err(Error::bad_request(format!(
                "at most {MAX_CUSTOM_TAGS} custom tags are allowed, got {}",
                tags.len()
            )));
        }
        Ok(())
    }
}
