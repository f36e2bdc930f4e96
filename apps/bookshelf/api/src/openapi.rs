use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Registers the `bearer_auth` scheme referenced by the domain handlers.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Bookshelf API",
        version = "0.1.0",
        description = "Book catalog with reader accounts, interactions and semantic search"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Combined document: every domain mounts its routes at the API root.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(domain_catalog::handlers::ApiDoc::openapi());
    doc.merge(domain_interactions::handlers::ApiDoc::openapi());
    doc.merge(domain_users::handlers::ApiDoc::openapi());
    doc.merge(domain_search::handlers::ApiDoc::openapi());
    doc
}
