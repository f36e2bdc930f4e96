use async_trait::async_trait;
use domain_catalog::{Book, BookCatalog, CatalogError, CatalogResult, Engagement, EngagementSource};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{InteractionError, InteractionResult};
use crate::models::{
    Comment, CommentFilter, CommentInput, CommentSummary, ListKind, Pagination, RateBook, Rating,
    RatingSummary, ToggleResponse, UserLibrary,
};
use crate::repository::InteractionRepository;

/// What the accounts domain needs to know about a user's activity.
#[async_trait]
pub trait UserActivity: Send + Sync {
    async fn library(&self, user_id: Uuid) -> InteractionResult<UserLibrary>;

    /// Remove everything the user did; returns the number of records removed
    async fn forget_user(&self, user_id: Uuid) -> InteractionResult<u64>;
}

fn validate<T: Validate>(input: &T) -> InteractionResult<()> {
    input
        .validate()
        .map_err(|e| InteractionError::Validation(e.to_string()))
}

/// Service layer for favorites, read lists, ratings and comments
///
/// Book existence and author aggregates are delegated to the catalog; every
/// favorite or rating change asks it to recompute the book author's stats.
#[derive(Clone)]
pub struct InteractionService<R: InteractionRepository> {
    repository: Arc<R>,
    catalog: Arc<dyn BookCatalog>,
}

impl<R: InteractionRepository> InteractionService<R> {
    pub fn new(repository: R, catalog: Arc<dyn BookCatalog>) -> Self {
        Self {
            repository: Arc::new(repository),
            catalog,
        }
    }

    async fn book(&self, id: Uuid) -> InteractionResult<Book> {
        Ok(self.catalog.book(id).await?)
    }

    // Lists

    pub async fn toggle(
        &self,
        kind: ListKind,
        user_id: Uuid,
        book_id: Uuid,
    ) -> InteractionResult<ToggleResponse> {
        let book = self.book(book_id).await?;

        let active = self.repository.toggle(kind, user_id, book_id).await?;
        tracing::info!(%kind, user_id = %user_id, book_id = %book_id, active, "Toggled book list entry");

        if kind == ListKind::Favorites {
            self.catalog.refresh_author_stats(book.author_id).await?;
        }
        Ok(ToggleResponse { book_id, active })
    }

    // Ratings

    pub async fn rate_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        input: RateBook,
    ) -> InteractionResult<Rating> {
        validate(&input)?;
        let book = self.book(book_id).await?;

        let rating = self
            .repository
            .upsert_rating(user_id, book_id, input.rating)
            .await?;

        self.catalog.refresh_author_stats(book.author_id).await?;
        Ok(rating)
    }

    pub async fn delete_rating(&self, user_id: Uuid, book_id: Uuid) -> InteractionResult<()> {
        let book = self.book(book_id).await?;

        if !self.repository.delete_rating(user_id, book_id).await? {
            return Err(InteractionError::RatingNotFound(book_id));
        }

        self.catalog.refresh_author_stats(book.author_id).await?;
        Ok(())
    }

    // Comments

    pub async fn list_book_comments(
        &self,
        book_id: Uuid,
        page: Pagination,
    ) -> InteractionResult<Vec<Comment>> {
        self.book(book_id).await?;
        self.repository
            .list_comments(CommentFilter::for_book(book_id, page))
            .await
    }

    pub async fn add_comment(
        &self,
        user_id: Uuid,
        username: &str,
        book_id: Uuid,
        input: CommentInput,
    ) -> InteractionResult<Comment> {
        validate(&input)?;
        self.book(book_id).await?;

        let comment = Comment::new(user_id, username.to_string(), book_id, input.content);
        self.repository.create_comment(comment).await
    }

    /// Edit a comment; only its author may do so
    pub async fn update_comment(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: CommentInput,
    ) -> InteractionResult<Comment> {
        validate(&input)?;
        let comment = self.get_comment(id).await?;

        if comment.user_id != user_id {
            return Err(InteractionError::NotCommentOwner(id));
        }
        self.repository.update_comment(id, input.content).await
    }

    /// Delete a comment; its author or an admin may do so
    pub async fn delete_comment(&self, user_id: Uuid, is_admin: bool, id: Uuid) -> InteractionResult<()> {
        let comment = self.get_comment(id).await?;

        if comment.user_id != user_id && !is_admin {
            return Err(InteractionError::NotCommentOwner(id));
        }
        self.remove_comment(id).await
    }

    pub async fn list_comments(&self, filter: CommentFilter) -> InteractionResult<Vec<Comment>> {
        self.repository.list_comments(filter).await
    }

    pub async fn get_comment(&self, id: Uuid) -> InteractionResult<Comment> {
        self.repository
            .get_comment(id)
            .await?
            .ok_or(InteractionError::CommentNotFound(id))
    }

    /// Edit any comment regardless of ownership
    pub async fn moderate_comment(&self, id: Uuid, input: CommentInput) -> InteractionResult<Comment> {
        validate(&input)?;
        self.get_comment(id).await?;
        self.repository.update_comment(id, input.content).await
    }

    pub async fn remove_comment(&self, id: Uuid) -> InteractionResult<()> {
        if !self.repository.delete_comment(id).await? {
            return Err(InteractionError::CommentNotFound(id));
        }
        Ok(())
    }

    /// Authors whose aggregates depend on the user's favorites and ratings
    async fn engaged_authors(&self, user_id: Uuid) -> InteractionResult<HashSet<Uuid>> {
        let mut book_ids: Vec<Uuid> = self
            .repository
            .list_entries(ListKind::Favorites, user_id)
            .await?
            .into_iter()
            .map(|entry| entry.book_id)
            .collect();
        book_ids.extend(
            self.repository
                .ratings_for_user(user_id)
                .await?
                .into_iter()
                .map(|rating| rating.book_id),
        );

        let mut authors = HashSet::new();
        for book_id in book_ids {
            match self.catalog.book(book_id).await {
                Ok(book) => {
                    authors.insert(book.author_id);
                }
                Err(CatalogError::BookNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(authors)
    }
}

#[async_trait]
impl<R: InteractionRepository + 'static> UserActivity for InteractionService<R> {
    async fn library(&self, user_id: Uuid) -> InteractionResult<UserLibrary> {
        let favorites: Vec<Uuid> = self
            .repository
            .list_entries(ListKind::Favorites, user_id)
            .await?
            .into_iter()
            .map(|entry| entry.book_id)
            .collect();
        let read_list: Vec<Uuid> = self
            .repository
            .list_entries(ListKind::ReadList, user_id)
            .await?
            .into_iter()
            .map(|entry| entry.book_id)
            .collect();

        let comments = self
            .repository
            .list_comments(CommentFilter {
                user_id: Some(user_id),
                limit: i64::MAX as u64,
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(|comment| CommentSummary {
                id: comment.id,
                book_id: comment.book_id,
                content: comment.content,
            })
            .collect();
        let ratings = self
            .repository
            .ratings_for_user(user_id)
            .await?
            .into_iter()
            .map(|rating| RatingSummary {
                id: rating.id,
                book_id: rating.book_id,
                rating: rating.rating,
            })
            .collect();

        Ok(UserLibrary {
            favorites: self.catalog.book_summaries(&favorites).await?,
            read_list: self.catalog.book_summaries(&read_list).await?,
            comments,
            ratings,
        })
    }

    async fn forget_user(&self, user_id: Uuid) -> InteractionResult<u64> {
        let authors = self.engaged_authors(user_id).await?;
        let removed = self.repository.delete_all_for_user(user_id).await?;

        for author_id in authors {
            self.catalog.refresh_author_stats(author_id).await?;
        }
        Ok(removed)
    }
}

/// Feeds catalog aggregates from the interaction tables
pub struct RepositoryEngagement<R: InteractionRepository> {
    repository: R,
}

impl<R: InteractionRepository> RepositoryEngagement<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: InteractionRepository> EngagementSource for RepositoryEngagement<R> {
    async fn engagement(&self, book_ids: &[Uuid]) -> CatalogResult<Engagement> {
        self.repository
            .engagement(book_ids)
            .await
            .map_err(|e| CatalogError::Internal(e.to_string()))
    }

    async fn forget_books(&self, book_ids: &[Uuid]) -> CatalogResult<()> {
        self.repository
            .delete_all_for_books(book_ids)
            .await
            .map_err(|e| CatalogError::Internal(e.to_string()))?;
        Ok(())
    }
}
