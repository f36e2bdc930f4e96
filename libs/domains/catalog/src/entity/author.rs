use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Author, AuthorInput};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub book_count: i64,
    #[sea_orm(column_type = "Double")]
    pub average_rating: f64,
    pub favorite_book_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Author {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            book_count: model.book_count,
            average_rating: model.average_rating,
            favorite_book_count: model.favorite_book_count,
        }
    }
}

impl From<AuthorInput> for ActiveModel {
    fn from(input: AuthorInput) -> Self {
        let author = Author::new(input);

        ActiveModel {
            id: Set(author.id),
            name: Set(author.name),
            book_count: Set(0),
            average_rating: Set(0.0),
            favorite_book_count: Set(0),
        }
    }
}
