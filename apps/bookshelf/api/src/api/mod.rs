use axum::{Router, middleware};
use axum_helpers::{JwtAuth, authenticate};
use domain_catalog::{CatalogRepository, CatalogService, PgCatalogRepository};
use domain_interactions::{
    InteractionRepository, InteractionService, PgInteractionRepository, RepositoryEngagement,
};
use domain_search::{EmbeddingProvider, RpcVectorStore, SearchService, VectorStore};
use domain_users::{
    AccountService, AccountsConfig, LoginAttemptStore, PgUserRepository, RedisLoginAttemptStore,
    UserRepository,
};
use std::sync::Arc;

pub mod health;

/// Data access for every domain
pub struct Repositories<C, I, U> {
    pub catalog: C,
    pub interactions: I,
    pub users: U,
}

/// Everything outside the relational store the services talk to
pub struct Collaborators {
    pub auth: JwtAuth,
    pub accounts: AccountsConfig,
    pub attempts: Arc<dyn LoginAttemptStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStore>,
}

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix will be added by the `create_router` helper.
pub fn routes(state: &crate::state::AppState) -> Router {
    let repositories = Repositories {
        catalog: PgCatalogRepository::new(state.db.clone()),
        interactions: PgInteractionRepository::new(state.db.clone()),
        users: PgUserRepository::new(state.db.clone()),
    };
    let collaborators = Collaborators {
        auth: state.jwt_auth.clone(),
        accounts: state.config.accounts.clone(),
        attempts: Arc::new(RedisLoginAttemptStore::new(state.redis.clone())),
        embedder: state.config.embedding.clone().build_provider(),
        vector_store: Arc::new(RpcVectorStore::new(state.config.vector_store.clone())),
    };

    compose(repositories, collaborators)
}

/// Wire the domain services together and merge their routers.
///
/// Catalog aggregates read engagement from interactions; profiles and account
/// deletion go through interactions as well. Every route sees the caller's
/// claims when a valid access token is presented.
pub fn compose<C, I, U>(repositories: Repositories<C, I, U>, collaborators: Collaborators) -> Router
where
    C: CatalogRepository + 'static,
    I: InteractionRepository + Clone + 'static,
    U: UserRepository + 'static,
{
    let engagement = Arc::new(RepositoryEngagement::new(repositories.interactions.clone()));
    let catalog = Arc::new(
        CatalogService::new(repositories.catalog).with_engagement_source(engagement),
    );
    let interactions = Arc::new(InteractionService::new(
        repositories.interactions,
        catalog.clone(),
    ));
    let accounts = Arc::new(
        AccountService::new(
            repositories.users,
            collaborators.auth.clone(),
            collaborators.accounts,
        )
        .with_attempt_store(collaborators.attempts)
        .with_activity(interactions.clone()),
    );
    let search = Arc::new(SearchService::new(
        collaborators.embedder,
        collaborators.vector_store,
        catalog.clone(),
    ));

    Router::new()
        .merge(domain_catalog::handlers::router(catalog))
        .merge(domain_interactions::handlers::router(interactions))
        .merge(domain_users::handlers::router(accounts))
        .merge(domain_search::handlers::router(search))
        .layer(middleware::from_fn_with_state(
            collaborators.auth,
            authenticate,
        ))
}

/// Router with the /ready endpoint, which needs the connection handles.
pub fn ready_router(state: crate::state::AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
