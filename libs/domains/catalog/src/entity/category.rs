use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Category, CategoryInput};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub book_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            book_count: model.book_count,
        }
    }
}

impl From<CategoryInput> for ActiveModel {
    fn from(input: CategoryInput) -> Self {
        let category = Category::new(input);

        ActiveModel {
            id: Set(category.id),
            name: Set(category.name),
            book_count: Set(0),
        }
    }
}
