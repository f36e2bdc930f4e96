use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, IntoCondition};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{author, book, category},
    error::{CatalogError, CatalogResult},
    models::{
        Author, AuthorInput, AuthorStats, Book, BookFilter, Category, CategoryInput, CreateBook,
        NameFilter, UpdateBook, search_term,
    },
    repository::CatalogRepository,
};

/// PostgreSQL catalog repository.
///
/// Deleting an author or category removes its books in the same transaction.
#[derive(Clone)]
pub struct PgCatalogRepository {
    db: DatabaseConnection,
}

impl PgCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// `%term%` with the term's `%`, `_` and `\` matched literally
///
/// Backslash is the default LIKE escape character in PostgreSQL.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn ilike(column: &str, term: &str) -> impl IntoCondition {
    Expr::cust_with_values(format!("{} ILIKE ?", column), [contains_pattern(term)])
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create_book(&self, input: CreateBook) -> CatalogResult<Book> {
        let active_model: book::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(book_id = %model.id, "Created book");
        Ok(model.into())
    }

    async fn get_book(&self, id: Uuid) -> CatalogResult<Option<Book>> {
        let model = book::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_books(&self, ids: &[Uuid]) -> CatalogResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = book::Entity::find()
            .filter(book::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_books(&self, filter: BookFilter) -> CatalogResult<Vec<Book>> {
        let mut query = book::Entity::find();

        if let Some(title) = search_term(&filter.title) {
            query = query.filter(ilike("title", title));
        }
        if let Some(author_id) = filter.author_id {
            query = query.filter(book::Column::AuthorId.eq(author_id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(book::Column::CategoryId.eq(category_id));
        }
        if let Some(min) = filter.min_pages {
            query = query.filter(book::Column::PageCount.gte(min));
        }
        if let Some(max) = filter.max_pages {
            query = query.filter(book::Column::PageCount.lte(max));
        }

        let models = query
            .order_by_desc(book::Column::CreatedAt)
            .order_by_desc(book::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn books_by_author(&self, author_id: Uuid) -> CatalogResult<Vec<Book>> {
        let models = book::Entity::find()
            .filter(book::Column::AuthorId.eq(author_id))
            .order_by_asc(book::Column::Title)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn books_by_category(&self, category_id: Uuid) -> CatalogResult<Vec<Book>> {
        let models = book::Entity::find()
            .filter(book::Column::CategoryId.eq(category_id))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_book(&self, id: Uuid, input: UpdateBook) -> CatalogResult<Book> {
        let model = book::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CatalogError::BookNotFound(id))?;

        let mut active: book::ActiveModel = model.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(summary) = input.summary {
            active.summary = Set(summary);
        }
        if let Some(page_count) = input.page_count {
            active.page_count = Set(page_count);
        }
        if let Some(author_id) = input.author_id {
            active.author_id = Set(author_id);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(cover) = input.cover {
            active.cover = Set(Some(cover));
        }
        if let Some(pdf_link) = input.pdf_link {
            active.pdf_link = Set(Some(pdf_link));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await?;

        tracing::info!(book_id = %id, "Updated book");
        Ok(updated.into())
    }

    async fn delete_book(&self, id: Uuid) -> CatalogResult<bool> {
        let result = book::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!(book_id = %id, "Deleted book");
        }
        Ok(result.rows_affected > 0)
    }

    async fn set_book_embedding(&self, id: Uuid, embedding: Vec<f32>) -> CatalogResult<bool> {
        let result = book::Entity::update_many()
            .col_expr(
                book::Column::Embedding,
                Expr::value(book::embedding_json(&embedding)),
            )
            .filter(book::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn create_author(&self, input: AuthorInput) -> CatalogResult<Author> {
        let active_model: author::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(author_id = %model.id, "Created author");
        Ok(model.into())
    }

    async fn get_author(&self, id: Uuid) -> CatalogResult<Option<Author>> {
        let model = author::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_authors(&self, filter: NameFilter) -> CatalogResult<Vec<Author>> {
        let mut query = author::Entity::find();
        if let Some(term) = search_term(&filter.search) {
            query = query.filter(ilike("name", term));
        }

        let models = query
            .order_by_asc(author::Column::Name)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn author_ids(&self) -> CatalogResult<Vec<Uuid>> {
        let ids = author::Entity::find()
            .select_only()
            .column(author::Column::Id)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn rename_author(&self, id: Uuid, input: AuthorInput) -> CatalogResult<Author> {
        let model = author::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CatalogError::AuthorNotFound(id))?;

        let mut active: author::ActiveModel = model.into();
        active.name = Set(input.name);
        Ok(active.update(&self.db).await?.into())
    }

    async fn delete_author(&self, id: Uuid) -> CatalogResult<bool> {
        let txn = self.db.begin().await?;
        book::Entity::delete_many()
            .filter(book::Column::AuthorId.eq(id))
            .exec(&txn)
            .await?;
        let result = author::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if result.rows_affected > 0 {
            tracing::info!(author_id = %id, "Deleted author and their books");
        }
        Ok(result.rows_affected > 0)
    }

    async fn set_author_stats(&self, id: Uuid, stats: AuthorStats) -> CatalogResult<()> {
        let result = author::Entity::update_many()
            .col_expr(author::Column::BookCount, Expr::value(stats.book_count))
            .col_expr(author::Column::AverageRating, Expr::value(stats.average_rating))
            .col_expr(
                author::Column::FavoriteBookCount,
                Expr::value(stats.favorite_book_count),
            )
            .filter(author::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogError::AuthorNotFound(id));
        }
        Ok(())
    }

    async fn create_category(&self, input: CategoryInput) -> CatalogResult<Category> {
        let active_model: category::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(category_id = %model.id, "Created category");
        Ok(model.into())
    }

    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        let model = category::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_categories(&self, filter: NameFilter) -> CatalogResult<Vec<Category>> {
        let mut query = category::Entity::find();
        if let Some(term) = search_term(&filter.search) {
            query = query.filter(ilike("name", term));
        }

        let models = query
            .order_by_asc(category::Column::Name)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn category_ids(&self) -> CatalogResult<Vec<Uuid>> {
        let ids = category::Entity::find()
            .select_only()
            .column(category::Column::Id)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn rename_category(&self, id: Uuid, input: CategoryInput) -> CatalogResult<Category> {
        let model = category::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;

        let mut active: category::ActiveModel = model.into();
        active.name = Set(input.name);
        Ok(active.update(&self.db).await?.into())
    }

    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool> {
        let txn = self.db.begin().await?;
        book::Entity::delete_many()
            .filter(book::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        let result = category::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if result.rows_affected > 0 {
            tracing::info!(category_id = %id, "Deleted category and its books");
        }
        Ok(result.rows_affected > 0)
    }

    async fn count_books_in_category(&self, category_id: Uuid) -> CatalogResult<i64> {
        let count = book::Entity::find()
            .filter(book::Column::CategoryId.eq(category_id))
            .count(&self.db)
            .await?;
        Ok(count as i64)
    }

    async fn set_category_book_count(&self, id: Uuid, book_count: i64) -> CatalogResult<()> {
        let result = category::Entity::update_many()
            .col_expr(category::Column::BookCount, Expr::value(book_count))
            .filter(category::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogError::CategoryNotFound(id));
        }
        Ok(())
    }
}
