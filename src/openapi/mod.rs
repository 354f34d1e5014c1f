use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Iwanyu Marketplace API",
        version = "1.0.0",
        description = r#"
# Iwanyu Marketplace API

Backend for a multi-vendor marketplace: customers browse and order,
vendors list products once approved, admins moderate.

## Authentication

Register or log in to obtain a bearer token, then send it on every
protected request:

```
Authorization: Bearer <token>
```

Logging out revokes the token.

## Errors

Every error uses the same JSON body:

```json
{
  "error": "Conflict",
  "message": "Email is already registered",
  "timestamp": "2025-03-02T10:30:00+00:00"
}
```

## Pagination

Paginated listings accept `page` (default 1) and `per_page`, and answer
`{data, pagination}`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Registration, login and the current account"),
        (name = "Catalog", description = "Categories and products"),
        (name = "Banners", description = "Storefront banners"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::banners::list_active_banners,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::handlers::common::PaginationMeta,
            crate::handlers::common::MessageResponse,
            crate::services::users::RegisterInput,
            crate::services::users::LoginInput,
            crate::services::users::AuthResponse,
            crate::services::users::UserResponse,
            crate::services::vendors::VendorProfile,
            crate::services::categories::CategoryResponse,
            crate::services::products::ProductSummary,
            crate::services::products::ProductDetail,
            crate::services::reviews::RatingSummary,
            crate::services::banners::BannerResponse,
            crate::handlers::health::HealthResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
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

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
