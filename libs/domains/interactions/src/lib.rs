//! Interactions Domain
//!
//! What readers do with the catalog: favorites and a read list (both toggled),
//! ratings from 0 to 5 (one per user and book, overwritten in place) and
//! comments.
//!
//! Books are looked up through [`domain_catalog::BookCatalog`]. Favorites and
//! ratings feed the author aggregates back through [`RepositoryEngagement`],
//! which implements the catalog's `EngagementSource`:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_catalog::{CatalogService, InMemoryCatalogRepository};
//! use domain_interactions::{InMemoryInteractionRepository, InteractionService, RepositoryEngagement};
//!
//! let interactions = InMemoryInteractionRepository::new();
//! let catalog = Arc::new(
//!     CatalogService::new(InMemoryCatalogRepository::new())
//!         .with_engagement_source(Arc::new(RepositoryEngagement::new(interactions.clone()))),
//! );
//! let service = Arc::new(InteractionService::new(interactions, catalog));
//! let router: axum::Router = domain_interactions::handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{InteractionError, InteractionResult};
pub use models::{
    Comment, CommentFilter, CommentInput, CommentSummary, ListEntry, ListKind, Pagination,
    RateBook, Rating, RatingSummary, ToggleResponse, UserLibrary,
};
pub use postgres::PgInteractionRepository;
pub use repository::{InMemoryInteractionRepository, InteractionRepository};
pub use service::{InteractionService, RepositoryEngagement, UserActivity};
