//! Iwanyu marketplace API
//!
//! Multi-vendor marketplace backend: accounts and roles, vendor onboarding,
//! catalog, checkout with stock reservation, payments, reviews, buyer/seller
//! messaging, banners and dashboards.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Extension, Router,
};
use std::{sync::Arc, time::Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};

use crate::{
    auth::{AuthConfig, AuthRouterExt, AuthService},
    config::AppConfig,
    db::DbPool,
    entities::Role,
    handlers::{
        admin, auth as auth_handlers, banners, categories, conversations, health, orders,
        products, reviews, vendors, AppServices,
    },
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        let db = Arc::new(db);
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config)));
        let services = AppServices::new(db.clone(), auth.clone(), &config);
        Self {
            db,
            config,
            auth,
            services,
            started_at: Instant::now(),
        }
    }
}

/// Everything mounted under `/api`, grouped by who may call it.
pub fn api_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/categories", get(categories::list_categories))
        .route("/categories/:key", get(categories::get_category))
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/reviews", get(reviews::list_reviews))
        .route("/vendors/:id", get(vendors::get_public_vendor))
        .route("/banners", get(banners::list_active_banners));

    let signed_in = Router::new()
        .route(
            "/auth/me",
            get(auth_handlers::me).put(auth_handlers::update_me),
        )
        .route("/auth/change-password", post(auth_handlers::change_password))
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/orders", get(orders::list_my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/orders/:id/payments", post(orders::record_payment))
        .route("/orders/:id/payment", get(orders::get_payment))
        .route("/reviews/:id", axum::routing::delete(reviews::delete_review))
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::start_conversation),
        )
        .route(
            "/conversations/:id/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route("/conversations/:id/read", post(conversations::mark_read))
        .with_auth();

    let customers = Router::new()
        .route("/orders", post(orders::place_order))
        .route("/products/:id/reviews", post(reviews::create_review))
        .with_roles(&[Role::Customer]);

    let vendor_only = Router::new()
        .route("/vendors", post(vendors::apply))
        .route(
            "/vendors/me",
            get(vendors::my_vendor).put(vendors::update_my_vendor),
        )
        .route("/vendors/me/products", get(products::my_products))
        .route("/vendors/me/orders", get(vendors::my_orders))
        .route("/vendors/me/analytics", get(vendors::my_analytics))
        .with_roles(&[Role::Vendor]);

    let sellers = Router::new()
        .route("/products", post(products::create_product))
        .route(
            "/products/:id",
            put(products::update_product).delete(products::delete_product),
        )
        .route("/products/:id/stock", post(products::adjust_stock))
        .route("/products/:id/variants", post(products::add_variant))
        .route(
            "/products/:id/variants/:variant_id",
            axum::routing::delete(products::delete_variant),
        )
        .route("/products/:id/images", post(products::add_image))
        .route(
            "/products/:id/images/:image_id",
            axum::routing::delete(products::delete_image),
        )
        .route("/orders/:id/status", put(orders::update_status))
        .with_roles(&[Role::Vendor, Role::Admin]);

    let admins = Router::new()
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/:key",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id/status", put(admin::set_user_active))
        .route("/admin/users/:id/verify-email", post(admin::verify_email))
        .route("/admin/vendors", get(admin::list_vendors))
        .route("/admin/vendors/:id/review", post(admin::review_vendor))
        .route("/admin/orders", get(admin::list_all_orders))
        .route("/admin/orders/:id/refund", post(admin::refund_payment))
        .route(
            "/admin/banners",
            get(banners::list_all_banners).post(banners::create_banner),
        )
        .route(
            "/admin/banners/:id",
            put(banners::update_banner).delete(banners::delete_banner),
        )
        .route("/admin/analytics/overview", get(admin::analytics_overview))
        .with_roles(&[Role::Admin]);

    Router::new()
        .merge(public)
        .merge(signed_in)
        .merge(customers)
        .merge(vendor_only)
        .merge(sellers)
        .merge(admins)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.should_allow_permissive_cors() {
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("no CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// The complete application: API, health, docs and the HTTP middleware stack.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let auth_service = state.auth.clone();

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .fallback(errors::not_found_fallback)
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config))
        .layer(Extension(auth_service))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(crate::tracing::request_id_middleware))
        .with_state(state)
}

pub mod prelude {
    pub use crate::auth::{AuthService, AuthUser};
    pub use crate::config::AppConfig;
    pub use crate::errors::{ApiError, ServiceError};
    pub use crate::services::Page;
    pub use crate::{build_router, AppState};
}
