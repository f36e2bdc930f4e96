use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_catalog::{Engagement, contains_pattern};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{comment, rating},
    error::{InteractionError, InteractionResult},
    models::{Comment, CommentFilter, ListEntry, ListKind, Rating},
    repository::InteractionRepository,
};

/// PostgreSQL implementation of InteractionRepository
#[derive(Clone)]
pub struct PgInteractionRepository {
    db: DatabaseConnection,
}

impl PgInteractionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn list_table(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Favorites => "favorites",
        ListKind::ReadList => "read_list",
    }
}

#[derive(Debug, FromQueryResult)]
struct ListEntryRow {
    id: Uuid,
    user_id: Uuid,
    book_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<ListEntryRow> for ListEntry {
    fn from(row: ListEntryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct EngagementRow {
    average_rating: Option<f64>,
    favorite_count: i64,
}

#[async_trait]
impl InteractionRepository for PgInteractionRepository {
    async fn toggle(&self, kind: ListKind, user_id: Uuid, book_id: Uuid) -> InteractionResult<bool> {
        let table = list_table(kind);
        let txn = self.db.begin().await?;

        let removed = txn
            .execute_raw(Statement::from_sql_and_values(
                DbBackend::Postgres,
                format!("DELETE FROM {} WHERE user_id = $1 AND book_id = $2", table),
                [user_id.into(), book_id.into()],
            ))
            .await?;

        if removed.rows_affected() > 0 {
            txn.commit().await?;
            return Ok(false);
        }

        let entry = ListEntry::new(user_id, book_id);
        txn.execute_raw(Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "INSERT INTO {} (id, user_id, book_id, created_at) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (user_id, book_id) DO NOTHING",
                table
            ),
            [
                entry.id.into(),
                entry.user_id.into(),
                entry.book_id.into(),
                entry.created_at.into(),
            ],
        ))
        .await?;
        txn.commit().await?;

        Ok(true)
    }

    async fn list_entries(&self, kind: ListKind, user_id: Uuid) -> InteractionResult<Vec<ListEntry>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "SELECT id, user_id, book_id, created_at FROM {} \
                 WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
                list_table(kind)
            ),
            [user_id.into()],
        );

        let rows = ListEntryRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_rating(&self, user_id: Uuid, book_id: Uuid, value: i32) -> InteractionResult<Rating> {
        let sql = r#"
            INSERT INTO ratings (id, user_id, book_id, rating, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (user_id, book_id)
            DO UPDATE SET rating = EXCLUDED.rating, updated_at = EXCLUDED.updated_at
            RETURNING *
        "#;
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                Uuid::now_v7().into(),
                user_id.into(),
                book_id.into(),
                value.into(),
                Utc::now().into(),
            ],
        );

        let model = rating::Entity::find()
            .from_raw_sql(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| InteractionError::Internal("Failed to upsert rating".to_string()))?;

        Ok(model.into())
    }

    async fn delete_rating(&self, user_id: Uuid, book_id: Uuid) -> InteractionResult<bool> {
        let result = rating::Entity::delete_many()
            .filter(rating::Column::UserId.eq(user_id))
            .filter(rating::Column::BookId.eq(book_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn ratings_for_user(&self, user_id: Uuid) -> InteractionResult<Vec<Rating>> {
        let models = rating::Entity::find()
            .filter(rating::Column::UserId.eq(user_id))
            .order_by_desc(rating::Column::UpdatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn engagement(&self, book_ids: &[Uuid]) -> InteractionResult<Engagement> {
        if book_ids.is_empty() {
            return Ok(Engagement::default());
        }

        let sql = r#"
            SELECT
                (SELECT AVG(rating)::float8 FROM ratings WHERE book_id = ANY($1)) AS average_rating,
                (SELECT COUNT(*) FROM favorites WHERE book_id = ANY($1)) AS favorite_count
        "#;
        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, sql, [book_ids.to_vec().into()]);

        let row = EngagementRow::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| InteractionError::Internal("Engagement query returned no row".to_string()))?;

        Ok(Engagement {
            average_rating: row.average_rating.unwrap_or(0.0),
            favorite_count: row.favorite_count,
        })
    }

    async fn create_comment(&self, comment: Comment) -> InteractionResult<Comment> {
        let active_model: comment::ActiveModel = comment.into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(comment_id = %model.id, book_id = %model.book_id, "Created comment");
        Ok(model.into())
    }

    async fn get_comment(&self, id: Uuid) -> InteractionResult<Option<Comment>> {
        let model = comment::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_comments(&self, filter: CommentFilter) -> InteractionResult<Vec<Comment>> {
        let mut query = comment::Entity::find();

        if let Some(book_id) = filter.book_id {
            query = query.filter(comment::Column::BookId.eq(book_id));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(comment::Column::UserId.eq(user_id));
        }
        if let Some(term) = filter.search_term() {
            query = query.filter(Expr::cust_with_values(
                "content ILIKE ?",
                [contains_pattern(term)],
            ));
        }

        let models = query
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_comment(&self, id: Uuid, content: String) -> InteractionResult<Comment> {
        let model = comment::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(InteractionError::CommentNotFound(id))?;

        let mut active: comment::ActiveModel = model.into();
        active.content = Set(content);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?.into())
    }

    async fn delete_comment(&self, id: Uuid) -> InteractionResult<bool> {
        let result = comment::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> InteractionResult<u64> {
        let txn = self.db.begin().await?;
        let mut removed = 0;

        for table in ["favorites", "read_list", "ratings", "comments"] {
            let result = txn
                .execute_raw(Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    format!("DELETE FROM {} WHERE user_id = $1", table),
                    [user_id.into()],
                ))
                .await?;
            removed += result.rows_affected();
        }
        txn.commit().await?;

        tracing::info!(user_id = %user_id, removed, "Deleted user interactions");
        Ok(removed)
    }

    async fn delete_all_for_books(&self, book_ids: &[Uuid]) -> InteractionResult<u64> {
        if book_ids.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let mut removed = 0;

        for table in ["favorites", "read_list", "ratings", "comments"] {
            let result = txn
                .execute_raw(Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    format!("DELETE FROM {} WHERE book_id = ANY($1)", table),
                    [book_ids.to_vec().into()],
                ))
                .await?;
            removed += result.rows_affected();
        }
        txn.commit().await?;

        tracing::info!(books = book_ids.len(), removed, "Deleted book interactions");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{MockDatabase, MockExecResult};

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_toggle_removes_existing_entry() {
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_exec_results([exec(1)])
            .into_connection();
        let repo = PgInteractionRepository::new(db);

        let active = repo
            .toggle(ListKind::Favorites, Uuid::now_v7(), Uuid::now_v7())
            .await
            .unwrap();
        assert!(!active);
    }

    #[tokio::test]
    async fn test_toggle_inserts_missing_entry() {
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_exec_results([exec(0), exec(1)])
            .into_connection();
        let repo = PgInteractionRepository::new(db);

        let active = repo
            .toggle(ListKind::ReadList, Uuid::now_v7(), Uuid::now_v7())
            .await
            .unwrap();
        assert!(active);
    }

    #[tokio::test]
    async fn test_upsert_rating_returns_row() {
        let now = Utc::now();
        let model = rating::Model {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            book_id: Uuid::now_v7(),
            rating: 4,
            created_at: now.into(),
            updated_at: now.into(),
        };
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([vec![model.clone()]])
            .into_connection();
        let repo = PgInteractionRepository::new(db);

        let rating = repo
            .upsert_rating(model.user_id, model.book_id, 4)
            .await
            .unwrap();
        assert_eq!(rating.id, model.id);
        assert_eq!(rating.rating, 4);
    }

    #[tokio::test]
    async fn test_engagement_of_no_books_skips_query() {
        let db = MockDatabase::new(DbBackend::Postgres).into_connection();
        let repo = PgInteractionRepository::new(db);

        assert_eq!(repo.engagement(&[]).await.unwrap(), Engagement::default());
    }

    #[tokio::test]
    async fn test_delete_all_for_user_sums_tables() {
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_exec_results([exec(2), exec(1), exec(3), exec(0)])
            .into_connection();
        let repo = PgInteractionRepository::new(db);

        assert_eq!(repo.delete_all_for_user(Uuid::now_v7()).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_delete_all_for_books_sums_tables() {
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_exec_results([exec(1), exec(1), exec(2), exec(4)])
            .into_connection();
        let repo = PgInteractionRepository::new(db);

        assert_eq!(repo.delete_all_for_books(&[Uuid::now_v7()]).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_delete_all_for_books_without_ids_skips_database() {
        let db = MockDatabase::new(DbBackend::Postgres).into_connection();
        let repo = PgInteractionRepository::new(db);

        assert_eq!(repo.delete_all_for_books(&[]).await.unwrap(), 0);
    }
}
