#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use iwanyu_api::{
    auth::password::hash_password,
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{user, Role},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use std::str::FromStr;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration_tests_signing_key_9d41b7e2c06a5f38";
pub const PASSWORD: &str = "secret123";

/// A signed-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    /// Vendor profile id for vendor accounts
    pub vendor_id: Option<Uuid>,
}

/// Full application over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::sqlite_memory())
            .await
            .expect("in-memory database");
        db::run_migrations(&pool).await.expect("migrations");

        let config = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "test".to_string(),
        );
        let state = AppState::new(pool, config);
        let router = build_router(state.clone());

        Self { router, state }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request and decode the JSON body (`Value::Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body), token).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(body), token).await
    }

    pub async fn register_customer(&self, email: &str) -> Session {
        let (status, body) = self
            .post(
                "/api/auth/register",
                json!({"name": "Test Customer", "email": email, "password": PASSWORD}),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register customer: {body}");
        session_from(&body)
    }

    /// Registers a vendor account. The vendor profile starts PENDING.
    pub async fn register_vendor(&self, email: &str, business_name: &str) -> Session {
        let (status, body) = self
            .post(
                "/api/auth/register",
                json!({
                    "name": "Test Vendor",
                    "email": email,
                    "password": PASSWORD,
                    "role": "VENDOR",
                    "business_name": business_name,
                    "address": "KN 3 Rd, Kigali"
                }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register vendor: {body}");
        session_from(&body)
    }

    /// Admins cannot self-register, so the row is written directly.
    pub async fn admin(&self) -> Session {
        let email = format!("admin-{}@iwanyu.test", Uuid::new_v4().simple());
        let now = Utc::now();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Test Admin".to_string()),
            email: Set(email.clone()),
            password_hash: Set(hash_password(PASSWORD).expect("hash")),
            role: Set(Role::Admin),
            is_active: Set(true),
            email_verified: Set(true),
            phone: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert admin");

        self.login(&email, PASSWORD).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Session {
        let (status, body) = self
            .post(
                "/api/auth/login",
                json!({"email": email, "password": password}),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login: {body}");
        session_from(&body)
    }

    pub async fn approve_vendor(&self, admin: &Session, vendor: &Session) {
        let vendor_id = vendor.vendor_id.expect("vendor profile");
        let (status, body) = self
            .post(
                &format!("/api/admin/vendors/{vendor_id}/review"),
                json!({"decision": "APPROVED", "note": "ok"}),
                Some(&admin.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approve vendor: {body}");
    }

    /// Registers a vendor and has an admin approve it.
    pub async fn approved_vendor(&self, admin: &Session, email: &str) -> Session {
        let vendor = self.register_vendor(email, "Test Shop").await;
        self.approve_vendor(admin, &vendor).await;
        vendor
    }

    pub async fn create_category(&self, admin: &Session, name: &str) -> Uuid {
        let (status, body) = self
            .post("/api/categories", json!({"name": name}), Some(&admin.token))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create category: {body}");
        uuid_field(&body["id"])
    }

    pub async fn create_product(
        &self,
        vendor: &Session,
        category_id: Uuid,
        name: &str,
        price: &str,
        stock: i32,
    ) -> Value {
        let (status, body) = self
            .post(
                "/api/products",
                json!({
                    "name": name,
                    "description": format!("{name} for tests"),
                    "price": price,
                    "stock": stock,
                    "category_id": category_id,
                    "tags": ["test"],
                    "images": [{"url": "https://cdn.iwanyu.test/p.jpg", "alt": name}]
                }),
                Some(&vendor.token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product: {body}");
        body
    }

    /// Admin, approved vendor, category and one product, ready for checkout.
    pub async fn storefront(&self, price: &str, stock: i32) -> Storefront {
        let admin = self.admin().await;
        let vendor = self
            .approved_vendor(&admin, &format!("vendor-{}@iwanyu.test", Uuid::new_v4().simple()))
            .await;
        let category_id = self.create_category(&admin, "Electronics").await;
        let product = self
            .create_product(&vendor, category_id, "Solar Lamp", price, stock)
            .await;
        Storefront {
            admin,
            vendor,
            category_id,
            product_id: uuid_field(&product["id"]),
        }
    }

    pub async fn place_order(
        &self,
        customer: &Session,
        lines: Value,
    ) -> (StatusCode, Value) {
        self.post(
            "/api/orders",
            json!({"items": lines, "shipping_address": "KG 7 Ave, Kigali"}),
            Some(&customer.token),
        )
        .await
    }

    pub async fn product_stock(&self, product_id: Uuid) -> i64 {
        let (status, body) = self.get(&format!("/api/products/{product_id}"), None).await;
        assert_eq!(status, StatusCode::OK, "get product: {body}");
        body["stock"].as_i64().expect("stock")
    }
}

pub struct Storefront {
    pub admin: Session,
    pub vendor: Session,
    pub category_id: Uuid,
    pub product_id: Uuid,
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

fn session_from(body: &Value) -> Session {
    let user = &body["user"];
    Session {
        token: body["token"].as_str().expect("token").to_string(),
        user_id: uuid_field(&user["id"]),
        email: user["email"].as_str().expect("email").to_string(),
        vendor_id: user["vendor"]["id"].as_str().map(|id| id.parse().expect("vendor id")),
    }
}

pub fn uuid_field(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| panic!("expected uuid, got {value}"))
}

/// Money fields serialize as strings; accept numbers too.
pub fn decimal_field(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => Decimal::from_str(raw).expect("decimal string"),
        Value::Number(num) => Decimal::from_str(&num.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}
