use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Author, AuthorInput, AuthorStats, Book, BookFilter, Category, CategoryInput, CreateBook,
    NameFilter, UpdateBook,
};

/// Persistence for books, authors and categories
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_book(&self, input: CreateBook) -> CatalogResult<Book>;

    async fn get_book(&self, id: Uuid) -> CatalogResult<Option<Book>>;

    /// Books with the given ids, in no particular order; unknown ids are skipped
    async fn get_books(&self, ids: &[Uuid]) -> CatalogResult<Vec<Book>>;

    /// Newest first
    async fn list_books(&self, filter: BookFilter) -> CatalogResult<Vec<Book>>;

    async fn books_by_author(&self, author_id: Uuid) -> CatalogResult<Vec<Book>>;

    async fn books_by_category(&self, category_id: Uuid) -> CatalogResult<Vec<Book>>;

    async fn update_book(&self, id: Uuid, input: UpdateBook) -> CatalogResult<Book>;

    async fn delete_book(&self, id: Uuid) -> CatalogResult<bool>;

    async fn set_book_embedding(&self, id: Uuid, embedding: Vec<f32>) -> CatalogResult<bool>;

    async fn create_author(&self, input: AuthorInput) -> CatalogResult<Author>;

    async fn get_author(&self, id: Uuid) -> CatalogResult<Option<Author>>;

    /// Ordered by name
    async fn list_authors(&self, filter: NameFilter) -> CatalogResult<Vec<Author>>;

    async fn author_ids(&self) -> CatalogResult<Vec<Uuid>>;

    async fn rename_author(&self, id: Uuid, input: AuthorInput) -> CatalogResult<Author>;

    /// Deletes the author and their books
    async fn delete_author(&self, id: Uuid) -> CatalogResult<bool>;

    async fn set_author_stats(&self, id: Uuid, stats: AuthorStats) -> CatalogResult<()>;

    async fn create_category(&self, input: CategoryInput) -> CatalogResult<Category>;

    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>>;

    /// Ordered by name
    async fn list_categories(&self, filter: NameFilter) -> CatalogResult<Vec<Category>>;

    async fn category_ids(&self) -> CatalogResult<Vec<Uuid>>;

    async fn rename_category(&self, id: Uuid, input: CategoryInput) -> CatalogResult<Category>;

    /// Deletes the category and its books
    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool>;

    async fn count_books_in_category(&self, category_id: Uuid) -> CatalogResult<i64>;

    async fn set_category_book_count(&self, id: Uuid, book_count: i64) -> CatalogResult<()>;
}

#[derive(Debug, Default)]
struct CatalogState {
    books: HashMap<Uuid, Book>,
    authors: HashMap<Uuid, Author>,
    categories: HashMap<Uuid, Category>,
}

/// In-memory implementation of CatalogRepository (for development/testing)
///
/// All three tables sit behind one lock so cascading deletes stay atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogRepository {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn create_book(&self, input: CreateBook) -> CatalogResult<Book> {
        let mut state = self.state.write().await;
        let book = Book::new(input);
        state.books.insert(book.id, book.clone());

        tracing::info!(book_id = %book.id, "Created book");
        Ok(book)
    }

    async fn get_book(&self, id: Uuid) -> CatalogResult<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.get(&id).cloned())
    }

    async fn get_books(&self, ids: &[Uuid]) -> CatalogResult<Vec<Book>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.books.get(id).cloned())
            .collect())
    }

    async fn list_books(&self, filter: BookFilter) -> CatalogResult<Vec<Book>> {
        let state = self.state.read().await;

        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect();

        // Newest first; v7 ids break ties between books created in the same instant
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(page(books, filter.offset, filter.limit))
    }

    async fn books_by_author(&self, author_id: Uuid) -> CatalogResult<Vec<Book>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .filter(|book| book.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn books_by_category(&self, category_id: Uuid) -> CatalogResult<Vec<Book>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .filter(|book| book.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn update_book(&self, id: Uuid, input: UpdateBook) -> CatalogResult<Book> {
        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or(CatalogError::BookNotFound(id))?;

        book.apply_update(input);

        tracing::info!(book_id = %id, "Updated book");
        Ok(book.clone())
    }

    async fn delete_book(&self, id: Uuid) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.books.remove(&id).is_some();

        if removed {
            tracing::info!(book_id = %id, "Deleted book");
        }
        Ok(removed)
    }

    async fn set_book_embedding(&self, id: Uuid, embedding: Vec<f32>) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        match state.books.get_mut(&id) {
            Some(book) => {
                book.embedding = Some(embedding);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_author(&self, input: AuthorInput) -> CatalogResult<Author> {
        let mut state = self.state.write().await;
        let author = Author::new(input);
        state.authors.insert(author.id, author.clone());

        tracing::info!(author_id = %author.id, "Created author");
        Ok(author)
    }

    async fn get_author(&self, id: Uuid) -> CatalogResult<Option<Author>> {
        let state = self.state.read().await;
        Ok(state.authors.get(&id).cloned())
    }

    async fn list_authors(&self, filter: NameFilter) -> CatalogResult<Vec<Author>> {
        let state = self.state.read().await;

        let mut authors: Vec<Author> = state
            .authors
            .values()
            .filter(|author| filter.matches(&author.name))
            .cloned()
            .collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(page(authors, filter.offset, filter.limit))
    }

    async fn author_ids(&self) -> CatalogResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state.authors.keys().copied().collect())
    }

    async fn rename_author(&self, id: Uuid, input: AuthorInput) -> CatalogResult<Author> {
        let mut state = self.state.write().await;
        let author = state
            .authors
            .get_mut(&id)
            .ok_or(CatalogError::AuthorNotFound(id))?;

        author.name = input.name;
        Ok(author.clone())
    }

    async fn delete_author(&self, id: Uuid) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        if state.authors.remove(&id).is_none() {
            return Ok(false);
        }

        state.books.retain(|_, book| book.author_id != id);

        tracing::info!(author_id = %id, "Deleted author and their books");
        Ok(true)
    }

    async fn set_author_stats(&self, id: Uuid, stats: AuthorStats) -> CatalogResult<()> {
        let mut state = self.state.write().await;
        let author = state
            .authors
            .get_mut(&id)
            .ok_or(CatalogError::AuthorNotFound(id))?;

        author.book_count = stats.book_count;
        author.average_rating = stats.average_rating;
        author.favorite_book_count = stats.favorite_book_count;
        Ok(())
    }

    async fn create_category(&self, input: CategoryInput) -> CatalogResult<Category> {
        let mut state = self.state.write().await;
        let category = Category::new(input);
        state.categories.insert(category.id, category.clone());

        tracing::info!(category_id = %category.id, "Created category");
        Ok(category)
    }

    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.get(&id).cloned())
    }

    async fn list_categories(&self, filter: NameFilter) -> CatalogResult<Vec<Category>> {
        let state = self.state.read().await;

        let mut categories: Vec<Category> = state
            .categories
            .values()
            .filter(|category| filter.matches(&category.name))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(page(categories, filter.offset, filter.limit))
    }

    async fn category_ids(&self) -> CatalogResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state.categories.keys().copied().collect())
    }

    async fn rename_category(&self, id: Uuid, input: CategoryInput) -> CatalogResult<Category> {
        let mut state = self.state.write().await;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(CatalogError::CategoryNotFound(id))?;

        category.name = input.name;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Ok(false);
        }

        state.books.retain(|_, book| book.category_id != id);

        tracing::info!(category_id = %id, "Deleted category and its books");
        Ok(true)
    }

    async fn count_books_in_category(&self, category_id: Uuid) -> CatalogResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .filter(|book| book.category_id == category_id)
            .count() as i64)
    }

    async fn set_category_book_count(&self, id: Uuid, book_count: i64) -> CatalogResult<()> {
        let mut state = self.state.write().await;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(CatalogError::CategoryNotFound(id))?;

        category.book_count = book_count;
        Ok(())
    }
}
