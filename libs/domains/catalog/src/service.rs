use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Author, AuthorDetail, AuthorInput, AuthorStats, Book, BookFilter, BookSummary, Category,
    CategoryInput, CreateBook, NameFilter, RefreshSummary, UpdateBook,
};
use crate::repository::CatalogRepository;

/// Reader engagement across a set of books
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Engagement {
    /// Mean of every individual rating, 0.0 when there are none
    pub average_rating: f64,
    pub favorite_count: i64,
}

/// Source of rating and favorite aggregates, provided by the interactions domain.
#[async_trait]
pub trait EngagementSource: Send + Sync {
    async fn engagement(&self, book_ids: &[Uuid]) -> CatalogResult<Engagement>;

    /// Drop every favorite, read-list entry, rating and comment on the books
    async fn forget_books(&self, book_ids: &[Uuid]) -> CatalogResult<()>;
}

/// Catalog operations other domains depend on.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    async fn book(&self, id: Uuid) -> CatalogResult<Book>;

    /// Summaries in the order of `ids`; ids of deleted books are skipped
    async fn book_summaries(&self, ids: &[Uuid]) -> CatalogResult<Vec<BookSummary>>;

    async fn refresh_author_stats(&self, author_id: Uuid) -> CatalogResult<()>;

    async fn store_embedding(&self, book_id: Uuid, embedding: Vec<f32>) -> CatalogResult<()>;
}

fn validate<T: Validate>(input: &T) -> CatalogResult<()> {
    input
        .validate()
        .map_err(|e| CatalogError::Validation(e.to_string()))
}

/// Service layer for catalog business logic
///
/// Author and category counters are never incremented in place: every write
/// that can change them triggers a recomputation from the underlying rows.
#[derive(Clone)]
pub struct CatalogService<R: CatalogRepository> {
    repository: Arc<R>,
    engagement: Option<Arc<dyn EngagementSource>>,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
            engagement: None,
        }
    }

    /// Without a source, average rating and favorite counts stay at zero.
    pub fn with_engagement_source(mut self, source: Arc<dyn EngagementSource>) -> Self {
        self.engagement = Some(source);
        self
    }

    // Books

    pub async fn list_books(&self, filter: BookFilter) -> CatalogResult<Vec<Book>> {
        self.repository.list_books(filter).await
    }

    pub async fn get_book(&self, id: Uuid) -> CatalogResult<Book> {
        self.repository
            .get_book(id)
            .await?
            .ok_or(CatalogError::BookNotFound(id))
    }

    pub async fn create_book(&self, input: CreateBook) -> CatalogResult<Book> {
        validate(&input)?;
        self.ensure_author_exists(input.author_id).await?;
        self.ensure_category_exists(input.category_id).await?;

        let book = self.repository.create_book(input).await?;

        self.refresh_author(book.author_id).await?;
        self.refresh_category(book.category_id).await?;
        Ok(book)
    }

    pub async fn update_book(&self, id: Uuid, input: UpdateBook) -> CatalogResult<Book> {
        validate(&input)?;
        let previous = self.get_book(id).await?;

        if let Some(author_id) = input.author_id {
            self.ensure_author_exists(author_id).await?;
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let book = self.repository.update_book(id, input).await?;

        self.refresh_author(book.author_id).await?;
        if previous.author_id != book.author_id {
            self.refresh_author(previous.author_id).await?;
        }
        self.refresh_category(book.category_id).await?;
        if previous.category_id != book.category_id {
            self.refresh_category(previous.category_id).await?;
        }
        Ok(book)
    }

    pub async fn delete_book(&self, id: Uuid) -> CatalogResult<()> {
        let book = self.get_book(id).await?;
        self.forget_books(&[id]).await?;

        if !self.repository.delete_book(id).await? {
            return Err(CatalogError::BookNotFound(id));
        }

        self.refresh_author(book.author_id).await?;
        self.refresh_category(book.category_id).await?;
        Ok(())
    }

    // Authors

    pub async fn list_authors(&self, filter: NameFilter) -> CatalogResult<Vec<Author>> {
        self.repository.list_authors(filter).await
    }

    pub async fn get_author(&self, id: Uuid) -> CatalogResult<Author> {
        self.repository
            .get_author(id)
            .await?
            .ok_or(CatalogError::AuthorNotFound(id))
    }

    /// Author with their books ordered by title
    pub async fn get_author_detail(&self, id: Uuid) -> CatalogResult<AuthorDetail> {
        let author = self.get_author(id).await?;

        let mut books = self.repository.books_by_author(id).await?;
        books.sort_by(|a, b| a.title.cmp(&b.title));

        Ok(AuthorDetail {
            author,
            books: books.iter().map(BookSummary::from).collect(),
        })
    }

    pub async fn create_author(&self, input: AuthorInput) -> CatalogResult<Author> {
        validate(&input)?;
        self.repository.create_author(input).await
    }

    pub async fn rename_author(&self, id: Uuid, input: AuthorInput) -> CatalogResult<Author> {
        validate(&input)?;
        self.repository.rename_author(id, input).await
    }

    /// Delete an author and their books, then recount the affected categories
    pub async fn delete_author(&self, id: Uuid) -> CatalogResult<()> {
        let books = self.repository.books_by_author(id).await?;
        let book_ids: Vec<Uuid> = books.iter().map(|book| book.id).collect();
        let categories: HashSet<Uuid> = books.into_iter().map(|book| book.category_id).collect();

        self.get_author(id).await?;
        self.forget_books(&book_ids).await?;

        if !self.repository.delete_author(id).await? {
            return Err(CatalogError::AuthorNotFound(id));
        }

        for category_id in categories {
            self.refresh_category(category_id).await?;
        }
        Ok(())
    }

    // Categories

    pub async fn list_categories(&self, filter: NameFilter) -> CatalogResult<Vec<Category>> {
        self.repository.list_categories(filter).await
    }

    pub async fn get_category(&self, id: Uuid) -> CatalogResult<Category> {
        self.repository
            .get_category(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))
    }

    pub async fn create_category(&self, input: CategoryInput) -> CatalogResult<Category> {
        validate(&input)?;
        self.repository.create_category(input).await
    }

    pub async fn rename_category(&self, id: Uuid, input: CategoryInput) -> CatalogResult<Category> {
        validate(&input)?;
        self.repository.rename_category(id, input).await
    }

    /// Delete a category and its books, then recompute the affected authors
    pub async fn delete_category(&self, id: Uuid) -> CatalogResult<()> {
        let books = self.repository.books_by_category(id).await?;
        let book_ids: Vec<Uuid> = books.iter().map(|book| book.id).collect();
        let authors: HashSet<Uuid> = books.into_iter().map(|book| book.author_id).collect();

        self.get_category(id).await?;
        self.forget_books(&book_ids).await?;

        if !self.repository.delete_category(id).await? {
            return Err(CatalogError::CategoryNotFound(id));
        }

        for author_id in authors {
            self.refresh_author(author_id).await?;
        }
        Ok(())
    }

    // Aggregates

    /// Recompute every author and category counter
    pub async fn refresh_all_stats(&self) -> CatalogResult<RefreshSummary> {
        let author_ids = self.repository.author_ids().await?;
        for id in &author_ids {
            self.refresh_author(*id).await?;
        }

        let category_ids = self.repository.category_ids().await?;
        for id in &category_ids {
            self.refresh_category(*id).await?;
        }

        tracing::info!(
            authors = author_ids.len(),
            categories = category_ids.len(),
            "Refreshed catalog aggregates"
        );
        Ok(RefreshSummary {
            authors: author_ids.len(),
            categories: category_ids.len(),
        })
    }

    async fn refresh_author(&self, author_id: Uuid) -> CatalogResult<()> {
        // The author may have just been deleted along with the book
        if self.repository.get_author(author_id).await?.is_none() {
            return Ok(());
        }

        let book_ids: Vec<Uuid> = self
            .repository
            .books_by_author(author_id)
            .await?
            .into_iter()
            .map(|book| book.id)
            .collect();

        let engagement = match (&self.engagement, book_ids.is_empty()) {
            (Some(source), false) => source.engagement(&book_ids).await?,
            _ => Engagement::default(),
        };

        let stats = AuthorStats {
            book_count: book_ids.len() as i64,
            average_rating: engagement.average_rating,
            favorite_book_count: engagement.favorite_count,
        };
        tracing::debug!(author_id = %author_id, ?stats, "Recomputed author stats");

        self.repository.set_author_stats(author_id, stats).await
    }

    async fn refresh_category(&self, category_id: Uuid) -> CatalogResult<()> {
        if self.repository.get_category(category_id).await?.is_none() {
            return Ok(());
        }

        let count = self.repository.count_books_in_category(category_id).await?;
        self.repository
            .set_category_book_count(category_id, count)
            .await
    }

    /// Interactions go before the book rows so nothing is left pointing at them
    async fn forget_books(&self, book_ids: &[Uuid]) -> CatalogResult<()> {
        match (&self.engagement, book_ids.is_empty()) {
            (Some(source), false) => source.forget_books(book_ids).await,
            _ => Ok(()),
        }
    }

    async fn ensure_author_exists(&self, id: Uuid) -> CatalogResult<()> {
        match self.repository.get_author(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::UnknownAuthor(id)),
        }
    }

    async fn ensure_category_exists(&self, id: Uuid) -> CatalogResult<()> {
        match self.repository.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::UnknownCategory(id)),
        }
    }
}

#[async_trait]
impl<R: CatalogRepository + 'static> BookCatalog for CatalogService<R> {
    async fn book(&self, id: Uuid) -> CatalogResult<Book> {
        self.get_book(id).await
    }

    async fn book_summaries(&self, ids: &[Uuid]) -> CatalogResult<Vec<BookSummary>> {
        let books: HashMap<Uuid, Book> = self
            .repository
            .get_books(ids)
            .await?
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| books.get(id).map(BookSummary::from))
            .collect())
    }

    async fn refresh_author_stats(&self, author_id: Uuid) -> CatalogResult<()> {
        self.refresh_author(author_id).await
    }

    async fn store_embedding(&self, book_id: Uuid, embedding: Vec<f32>) -> CatalogResult<()> {
        if !self.repository.set_book_embedding(book_id, embedding).await? {
            return Err(CatalogError::BookNotFound(book_id));
        }
        tracing::info!(book_id = %book_id, "Stored book embedding");
        Ok(())
    }
}
