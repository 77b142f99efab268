//! Kick Livestreams API types.

use crate::error::{Error, Result};
use crate::kick_api::categories::Category;
use crate::kick_api::channels::MAX_CHANNEL_LOOKUPS;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stream that is live right now.
///
/// See: <https://docs.kick.com/apis/livestreams>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Livestream {
    pub broadcaster_user_id: u64,
    pub channel_id: u64,
    pub slug: String,
    #[serde(default)]
    pub stream_title: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub has_mature_content: bool,
    #[serde(default)]
    pub language: String,
    pub started_at: Timestamp,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub viewer_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivestreamSort {
    ViewerCount,
    StartedAt,
}

impl LivestreamSort {
    fn as_str(self) -> &'static str {
        match self {
            LivestreamSort::ViewerCount => "viewer_count",
            LivestreamSort::StartedAt => "started_at",
        }
    }
}

/// Filters for `list_livestreams`. The default lists all live streams in Kick's default order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivestreamQuery {
    pub broadcaster_user_ids: Vec<u64>,
    pub category_id: Option<u64>,
    /// ISO 639-1 language code, e.g. `en`.
    pub language: Option<String>,
    /// Between 1 and 100.
    pub limit: Option<u32>,
    pub sort: Option<LivestreamSort>,
}

impl LivestreamQuery {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.broadcaster_user_ids.len() > MAX_CHANNEL_LOOKUPS {
            return Err(Error::bad_request(format!(
                "livestream lookup is limited to {MAX_CHANNEL_LOOKUPS} broadcasters, got {}",
                self.broadcaster_user_ids.len()
            )));
        }
        if let Some(limit) = self.limit
            && !(1..=100).contains(&limit)
        {
            return Err(Error::bad_request(format!(
                "livestream limit must be between 1 and 100, got {limit}"
            )));
        }
        if let Some(language) = &self.language
            && language.trim().is_empty()
        {
            return Err(Error::bad_request("language filter must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = self
            .broadcaster_user_ids
            .iter()
            .map(|id| ("broadcaster_user_id".to_string(), id.to_string()))
            .collect();
        if let Some(category_id) = self.category_id {
            query.push(("category_id".to_string(), category_id.to_string()));
        }
        if let Some(language) = &self.language {
            query.push(("language".to_string(), language.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(sort) = self.sort {
            query.push(("sort".to_string(), sort.as_str().to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_parameters() {
        let query = LivestreamQuery {
            broadcaster_user_ids: vec![7],
            category_id: Some(15),
            language: Some("en".into()),
            limit: Some(25),
            sort: Some(LivestreamSort::ViewerCount),
        };
        assert!(query.validate().is_ok());
        assert_eq!(
            query.to_query(),
            vec![
                ("broadcaster_user_id".to_string(), "7".to_string()),
                ("category_id".to_string(), "15".to_string()),
                ("language".to_string(), "en".to_string()),
                ("limit".to_string(), "25".to_string()),
                ("sort".to_string(), "viewer_count".to_string()),
            ]
        );
        assert!(LivestreamQuery::default().to_query().is_empty());
    }

    #[test]
    fn limit_bounds() {
        for limit in [0, 101] {
            let query = LivestreamQuery {
                limit: Some(limit),
                ..Default::default()
            };
            assert_eq!(query.validate().unwrap_err().kind(), ErrorKind::BadRequest);
        }
        let query = LivestreamQuery {
            broadcaster_user_ids: (0..51).collect(),
            ..Default::default()
        };
        assert_eq!(query.validate().unwrap_err().kind(), ErrorKind::BadRequest);
    }
}
