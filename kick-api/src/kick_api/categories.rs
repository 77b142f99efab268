//! Kick Categories API types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A category (game or topic) a livestream can be filed under.
///
/// See: <https://docs.kick.com/apis/categories>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    /// URL of the category's cover image.
    #[serde(default)]
    pub thumbnail: String,
}

pub(crate) fn validate_search(query: &str, page: u32) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::bad_request("category search requires a query"));
    }
    if page == 0 {
        return Err(Error::bad_request("category search pages start at 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn search_needs_query_and_positive_page() {
        assert!(validate_search("just chatting", 1).is_ok());
        assert_eq!(
            validate_search("   ", 1).unwrap_err().kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            validate_search("slots", 0).unwrap_err().kind(),
            ErrorKind::BadRequest
        );
    }
}
