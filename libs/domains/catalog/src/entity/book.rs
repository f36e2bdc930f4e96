use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Book, CreateBook};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    pub page_count: i32,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub cover: Option<String>,
    pub pdf_link: Option<String>,
    /// JSON array of floats
    pub embedding: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Book {
    fn from(model: Model) -> Self {
        let embedding = model.embedding.and_then(|value| {
            serde_json::from_value::<Vec<f32>>(value)
                .inspect_err(|e| {
                    tracing::warn!(book_id = %model.id, error = %e, "Ignoring undecodable book embedding");
                })
                .ok()
        });

        Self {
            id: model.id,
            title: model.title,
            summary: model.summary,
            page_count: model.page_count,
            author_id: model.author_id,
            category_id: model.category_id,
            cover: model.cover,
            pdf_link: model.pdf_link,
            embedding,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<CreateBook> for ActiveModel {
    fn from(input: CreateBook) -> Self {
        let book = Book::new(input);

        ActiveModel {
            id: Set(book.id),
            title: Set(book.title),
            summary: Set(book.summary),
            page_count: Set(book.page_count),
            author_id: Set(book.author_id),
            category_id: Set(book.category_id),
            cover: Set(book.cover),
            pdf_link: Set(book.pdf_link),
            embedding: Set(None),
            created_at: Set(book.created_at.into()),
            updated_at: Set(book.updated_at.into()),
        }
    }
}

/// Serialize an embedding for the JSON column
pub fn embedding_json(embedding: &[f32]) -> Json {
    Json::Array(
        embedding
            .iter()
            .map(|value| Json::from(f64::from(*value)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn model(embedding: Option<Json>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::now_v7(),
            title: "Solaris".to_string(),
            summary: String::new(),
            page_count: 204,
            author_id: Uuid::now_v7(),
            category_id: Uuid::now_v7(),
            cover: None,
            pdf_link: None,
            embedding,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn test_embedding_column_decodes() {
        let book = Book::from(model(Some(embedding_json(&[0.5, -0.25]))));
        assert_eq!(book.embedding, Some(vec![0.5, -0.25]));
    }

    #[test]
    fn test_corrupt_embedding_column_is_dropped() {
        let book = Book::from(model(Some(serde_json::json!([0.5, null]))));
        assert_eq!(book.embedding, None);

        let book = Book::from(model(Some(serde_json::json!({ "vector": [1.0] }))));
        assert_eq!(book.embedding, None);
    }
}
