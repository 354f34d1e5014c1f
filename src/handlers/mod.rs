pub mod admin;
pub mod auth;
pub mod banners;
pub mod categories;
pub mod common;
pub mod conversations;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod vendors;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    services::{
        analytics::AnalyticsService, banners::BannerService, categories::CategoryService,
        conversations::ConversationService, orders::OrderService, payments::PaymentService,
        products::ProductService, reviews::ReviewService, users::UserService,
        vendors::VendorService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub vendors: Arc<VendorService>,
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub reviews: Arc<ReviewService>,
    pub conversations: Arc<ConversationService>,
    pub banners: Arc<BannerService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, auth_service: Arc<AuthService>, config: &AppConfig) -> Self {
        Self {
            users: Arc::new(UserService::new(db_pool.clone(), auth_service)),
            vendors: Arc::new(VendorService::new(db_pool.clone())),
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                config.default_currency.to_uppercase(),
            )),
            payments: Arc::new(PaymentService::new(db_pool.clone())),
            reviews: Arc::new(ReviewService::new(db_pool.clone())),
            conversations: Arc::new(ConversationService::new(db_pool.clone())),
            banners: Arc::new(BannerService::new(db_pool.clone())),
            analytics: Arc::new(AnalyticsService::new(db_pool)),
        }
    }
}
