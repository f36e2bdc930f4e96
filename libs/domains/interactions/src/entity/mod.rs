//! Sea-ORM entities for ratings and comments.
//!
//! `favorites` and `read_list` share one shape and are accessed with raw
//! statements in [`crate::postgres`]. Every table carries a unique
//! `(user_id, book_id)` constraint except `comments`.

pub mod comment;
pub mod rating;
