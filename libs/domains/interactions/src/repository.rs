use async_trait::async_trait;
use chrono::Utc;
use domain_catalog::Engagement;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{InteractionError, InteractionResult};
use crate::models::{Comment, CommentFilter, ListEntry, ListKind, Rating};

/// Persistence for favorites, read lists, ratings and comments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Add the book to the list, or remove it when already present.
    /// Returns whether the book is in the list afterwards.
    async fn toggle(&self, kind: ListKind, user_id: Uuid, book_id: Uuid) -> InteractionResult<bool>;

    /// A user's list, newest first
    async fn list_entries(&self, kind: ListKind, user_id: Uuid) -> InteractionResult<Vec<ListEntry>>;

    /// Insert or overwrite the (user, book) rating
    async fn upsert_rating(&self, user_id: Uuid, book_id: Uuid, rating: i32) -> InteractionResult<Rating>;

    async fn delete_rating(&self, user_id: Uuid, book_id: Uuid) -> InteractionResult<bool>;

    async fn ratings_for_user(&self, user_id: Uuid) -> InteractionResult<Vec<Rating>>;

    /// Rating average and favorite count across the given books
    async fn engagement(&self, book_ids: &[Uuid]) -> InteractionResult<Engagement>;

    async fn create_comment(&self, comment: Comment) -> InteractionResult<Comment>;

    async fn get_comment(&self, id: Uuid) -> InteractionResult<Option<Comment>>;

    /// Newest first
    async fn list_comments(&self, filter: CommentFilter) -> InteractionResult<Vec<Comment>>;

    async fn update_comment(&self, id: Uuid, content: String) -> InteractionResult<Comment>;

    async fn delete_comment(&self, id: Uuid) -> InteractionResult<bool>;

    /// Remove every interaction the user owns; returns the number of rows removed
    async fn delete_all_for_user(&self, user_id: Uuid) -> InteractionResult<u64>;

    /// Remove every interaction that points at one of the books; returns the number of rows removed
    async fn delete_all_for_books(&self, book_ids: &[Uuid]) -> InteractionResult<u64>;
}

#[derive(Debug, Default)]
struct InteractionState {
    lists: HashMap<(ListKind, Uuid, Uuid), ListEntry>,
    ratings: HashMap<(Uuid, Uuid), Rating>,
    comments: HashMap<Uuid, Comment>,
}

/// In-memory implementation of InteractionRepository (for development/testing)
///
/// Uniqueness per (user, book) comes from the map keys; toggles and upserts
/// run under a single write lock.
#[derive(Debug, Default, Clone)]
pub struct InMemoryInteractionRepository {
    state: Arc<RwLock<InteractionState>>,
}

impl InMemoryInteractionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn toggle(&self, kind: ListKind, user_id: Uuid, book_id: Uuid) -> InteractionResult<bool> {
        let mut state = self.state.write().await;
        let key = (kind, user_id, book_id);

        if state.lists.remove(&key).is_some() {
            return Ok(false);
        }

        state.lists.insert(key, ListEntry::new(user_id, book_id));
        Ok(true)
    }

    async fn list_entries(&self, kind: ListKind, user_id: Uuid) -> InteractionResult<Vec<ListEntry>> {
        let state = self.state.read().await;

        let mut entries: Vec<ListEntry> = state
            .lists
            .iter()
            .filter(|((k, user, _), _)| *k == kind && *user == user_id)
            .map(|(_, entry)| entry.clone())
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(entries)
    }

    async fn upsert_rating(&self, user_id: Uuid, book_id: Uuid, rating: i32) -> InteractionResult<Rating> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let entry = state
            .ratings
            .entry((user_id, book_id))
            .and_modify(|existing| {
                existing.rating = rating;
                existing.updated_at = now;
            })
            .or_insert_with(|| Rating {
                id: Uuid::now_v7(),
                user_id,
                book_id,
                rating,
                created_at: now,
                updated_at: now,
            });

        Ok(entry.clone())
    }

    async fn delete_rating(&self, user_id: Uuid, book_id: Uuid) -> InteractionResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.ratings.remove(&(user_id, book_id)).is_some())
    }

    async fn ratings_for_user(&self, user_id: Uuid) -> InteractionResult<Vec<Rating>> {
        let state = self.state.read().await;

        let mut ratings: Vec<Rating> = state
            .ratings
            .values()
            .filter(|rating| rating.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(ratings)
    }

    async fn engagement(&self, book_ids: &[Uuid]) -> InteractionResult<Engagement> {
        let state = self.state.read().await;

        let ratings: Vec<i32> = state
            .ratings
            .values()
            .filter(|rating| book_ids.contains(&rating.book_id))
            .map(|rating| rating.rating)
            .collect();
        let favorite_count = state
            .lists
            .keys()
            .filter(|(kind, _, book_id)| *kind == ListKind::Favorites && book_ids.contains(book_id))
            .count() as i64;

        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64
        };

        Ok(Engagement {
            average_rating,
            favorite_count,
        })
    }

    async fn create_comment(&self, comment: Comment) -> InteractionResult<Comment> {
        let mut state = self.state.write().await;
        state.comments.insert(comment.id, comment.clone());

        tracing::info!(comment_id = %comment.id, book_id = %comment.book_id, "Created comment");
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> InteractionResult<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state.comments.get(&id).cloned())
    }

    async fn list_comments(&self, filter: CommentFilter) -> InteractionResult<Vec<Comment>> {
        let state = self.state.read().await;

        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|comment| filter.matches(comment))
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(comments
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn update_comment(&self, id: Uuid, content: String) -> InteractionResult<Comment> {
        let mut state = self.state.write().await;
        let comment = state
            .comments
            .get_mut(&id)
            .ok_or(InteractionError::CommentNotFound(id))?;

        comment.content = content;
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> InteractionResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.comments.remove(&id).is_some())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> InteractionResult<u64> {
        let mut state = self.state.write().await;
        let before = state.lists.len() + state.ratings.len() + state.comments.len();

        state.lists.retain(|(_, user, _), _| *user != user_id);
        state.ratings.retain(|(user, _), _| *user != user_id);
        state.comments.retain(|_, comment| comment.user_id != user_id);

        let after = state.lists.len() + state.ratings.len() + state.comments.len();
        Ok((before - after) as u64)
    }

    async fn delete_all_for_books(&self, book_ids: &[Uuid]) -> InteractionResult<u64> {
        let mut state = self.state.write().await;
        let before = state.lists.len() + state.ratings.len() + state.comments.len();

        state.lists.retain(|(_, _, book), _| !book_ids.contains(book));
        state.ratings.retain(|(_, book), _| !book_ids.contains(book));
        state.comments.retain(|_, comment| !book_ids.contains(&comment.book_id));

        let after = state.lists.len() + state.ratings.len() + state.comments.len();
        Ok((before - after) as u64)
    }
}
