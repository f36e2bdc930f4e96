//! Catalog Domain
//!
//! Books, authors and categories. Author and category counters are
//! denormalized and recomputed from the underlying rows after every write that
//! can change them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← public listings + admin CRUD
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐      ┌──────────────────┐
//! │   Service   │ ───► │ EngagementSource │  ← ratings/favorites (interactions)
//! └──────┬──────┘      └──────────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← in-memory or PostgreSQL (sea-orm)
//! └─────────────┘
//! ```
//!
//! Other domains talk to the catalog through the object-safe [`BookCatalog`]
//! trait.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_catalog::{handlers, CatalogService, InMemoryCatalogRepository};
//!
//! let service = Arc::new(CatalogService::new(InMemoryCatalogRepository::new()));
//! let router: axum::Router = handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{CatalogError, CatalogResult};
pub use models::{
    Author, AuthorDetail, AuthorInput, AuthorStats, Book, BookFilter, BookSummary, Category,
    CategoryInput, CreateBook, NameFilter, RefreshSummary, UpdateBook,
};
pub use postgres::{PgCatalogRepository, contains_pattern};
pub use repository::{CatalogRepository, InMemoryCatalogRepository};
pub use service::{BookCatalog, CatalogService, Engagement, EngagementSource};
