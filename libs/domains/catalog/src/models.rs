use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// A book in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub page_count: i32,
    pub author_id: Uuid,
    pub category_id: Uuid,
    /// Cover image URL or storage reference
    pub cover: Option<String>,
    pub pdf_link: Option<String>,
    /// Precomputed sentence embedding, kept out of API responses
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact book projection used in author pages and user libraries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub cover: Option<String>,
    pub page_count: i32,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            cover: book.cover.clone(),
            page_count: book.page_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    /// Number of books written by this author
    pub book_count: i64,
    /// Mean of every rating left on this author's books
    pub average_rating: f64,
    /// Number of favorite records on this author's books
    pub favorite_book_count: i64,
}

/// Author together with the books they wrote
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<BookSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub book_count: i64,
}

/// Aggregates recomputed for an author
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuthorStats {
    pub book_count: i64,
    pub average_rating: f64,
    pub favorite_book_count: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub page_count: i32,
    pub author_id: Uuid,
    pub category_id: Uuid,
    #[validate(length(max = 500))]
    pub cover: Option<String>,
    #[validate(url)]
    pub pdf_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub summary: Option<String>,
    #[validate(range(min = 0))]
    pub page_count: Option<i32>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub cover: Option<String>,
    #[validate(url)]
    pub pdf_link: Option<String>,
}

/// Create or rename an author
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Create or rename a category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

/// Query filters for listing books
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct BookFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub min_pages: Option<i32>,
    pub max_pages: Option<i32>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// Query filters for author and category listings
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct NameFilter {
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

impl Default for BookFilter {
    fn default() -> Self {
        Self {
            title: None,
            author_id: None,
            category_id: None,
            min_pages: None,
            max_pages: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self {
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Trimmed, non-empty search term
pub(crate) fn search_term(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|term| !term.is_empty())
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(title) = search_term(&self.title) {
            if !book.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        if let Some(author_id) = self.author_id {
            if book.author_id != author_id {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if book.category_id != category_id {
                return false;
            }
        }
        if let Some(min) = self.min_pages {
            if book.page_count < min {
                return false;
            }
        }
        if let Some(max) = self.max_pages {
            if book.page_count > max {
                return false;
            }
        }
        true
    }
}

impl NameFilter {
    pub fn matches(&self, name: &str) -> bool {
        search_term(&self.search)
            .map(|term| name.to_lowercase().contains(&term.to_lowercase()))
            .unwrap_or(true)
    }
}

/// Counts returned by a full aggregate refresh
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct RefreshSummary {
    pub authors: usize,
    pub categories: usize,
}

impl Book {
    pub fn new(input: CreateBook) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: input.title,
            summary: input.summary,
            page_count: input.page_count,
            author_id: input.author_id,
            category_id: input.category_id,
            cover: input.cover,
            pdf_link: input.pdf_link,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateBook) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(summary) = update.summary {
            self.summary = summary;
        }
        if let Some(page_count) = update.page_count {
            self.page_count = page_count;
        }
        if let Some(author_id) = update.author_id {
            self.author_id = author_id;
        }
        if let Some(category_id) = update.category_id {
            self.category_id = category_id;
        }
        if let Some(cover) = update.cover {
            self.cover = Some(cover);
        }
        if let Some(pdf_link) = update.pdf_link {
            self.pdf_link = Some(pdf_link);
        }
        self.updated_at = Utc::now();
    }

    /// Text fed to the sentence encoder when indexing this book
    pub fn embedding_text(&self) -> String {
        if self.summary.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{}. {}", self.title, self.summary)
        }
    }
}

impl Author {
    pub fn new(input: AuthorInput) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            book_count: 0,
            average_rating: 0.0,
            favorite_book_count: 0,
        }
    }
}

impl Category {
    pub fn new(input: CategoryInput) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            book_count: 0,
        }
    }
}
