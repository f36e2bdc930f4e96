use chrono::{DateTime, Utc};
use domain_catalog::BookSummary;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Per-user book lists that are toggled on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListKind {
    Favorites,
    ReadList,
}

/// Membership of a book in a user's favorites or read list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ListEntry {
    pub fn new(user_id: Uuid, book_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            book_id,
            created_at: Utc::now(),
        }
    }
}

/// Result of a favorite or read-list toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ToggleResponse {
    pub book_id: Uuid,
    /// Whether the book is in the list after the call
    pub active: bool,
}

/// A user's rating of a book, unique per (user, book)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RateBook {
    /// Whole number from 0 to 5
    #[validate(range(min = 0, max = 5))]
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub book_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(user_id: Uuid, username: String, book_id: Uuid, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            username,
            book_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Body for creating or editing a comment
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 2000), custom(function = "not_blank"))]
    pub content: String,
}

/// Filters for comment listings, newest first
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CommentFilter {
    pub book_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring of the content
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// Pagination for a single book's comments
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Default for CommentFilter {
    fn default() -> Self {
        Self {
            book_id: None,
            user_id: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl CommentFilter {
    pub fn for_book(book_id: Uuid, page: Pagination) -> Self {
        Self {
            book_id: Some(book_id),
            user_id: None,
            search: None,
            limit: page.limit,
            offset: page.offset,
        }
    }

    pub(crate) fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        if let Some(book_id) = self.book_id {
            if comment.book_id != book_id {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if comment.user_id != user_id {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            if !comment.content.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommentSummary {
    pub id: Uuid,
    pub book_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingSummary {
    pub id: Uuid,
    pub book_id: Uuid,
    pub rating: i32,
}

/// Everything a user has done with the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserLibrary {
    pub favorites: Vec<BookSummary>,
    pub read_list: Vec<BookSummary>,
    pub comments: Vec<CommentSummary>,
    pub ratings: Vec<RatingSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(RateBook { rating: 0 }.validate().is_ok());
        assert!(RateBook { rating: 5 }.validate().is_ok());
        assert!(RateBook { rating: -1 }.validate().is_err());
        assert!(RateBook { rating: 6 }.validate().is_err());
    }

    #[test]
    fn test_blank_comment_rejected() {
        let input = CommentInput {
            content: "   ".to_string(),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_comment_too_long_rejected() {
        let input = CommentInput {
            content: "x".repeat(2001),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_comment_filter_matches() {
        let book_id = Uuid::now_v7();
        let comment = Comment::new(Uuid::now_v7(), "reader".into(), book_id, "Loved it".into());

        assert!(CommentFilter::for_book(book_id, Pagination::default()).matches(&comment));
        assert!(!CommentFilter::for_book(Uuid::now_v7(), Pagination::default()).matches(&comment));

        let search = CommentFilter {
            search: Some("LOVED".into()),
            ..Default::default()
        };
        assert!(search.matches(&comment));
    }

    #[test]
    fn test_list_kind_names() {
        assert_eq!(ListKind::ReadList.to_string(), "read_list");
        assert_eq!(ListKind::Favorites.to_string(), "favorites");
    }
}
