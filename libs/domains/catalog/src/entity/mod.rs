//! Sea-ORM entities for the catalog tables.
//!
//! The schema is owned by the external migration tool; `book.author_id` and
//! `book.category_id` reference their parents with `ON DELETE CASCADE`.

pub mod author;
pub mod book;
pub mod category;
