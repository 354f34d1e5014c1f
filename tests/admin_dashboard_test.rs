//! Admin moderation, storefront banners and the dashboard figures.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal_field, uuid_field, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn storefront_shows_active_banners_in_order() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let banners = [
        json!({"title": "Rainy season sale", "position": "HERO", "sort_order": 2}),
        json!({"title": "New arrivals", "position": "HERO", "sort_order": 1,
               "image_url": "https://cdn.iwanyu.test/hero.jpg", "link_url": "/products?sort=newest"}),
        json!({"title": "Free delivery in Kigali", "position": "PROMOTIONAL"}),
        json!({"title": "Draft", "position": "HERO", "is_active": false}),
    ];
    let mut ids = Vec::new();
    for banner in banners {
        let (status, body) = app.post("/api/admin/banners", banner, Some(&admin.token)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(uuid_field(&body["id"]));
    }

    let (status, body) = app.get("/api/banners", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, hero) = app.get("/api/banners?position=HERO", None).await;
    let titles: Vec<_> = hero
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["New arrivals", "Rainy season sale"]);

    let (status, all) = app.get("/api/admin/banners", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 4);

    let (status, body) = app
        .put(
            &format!("/api/admin/banners/{}", ids[3]),
            json!({"is_active": true, "sort_order": 0}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], true);
    let (_, hero) = app.get("/api/banners?position=HERO", None).await;
    assert_eq!(hero[0]["title"], "Draft");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/admin/banners/{}", ids[0]),
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/admin/banners/{}", ids[0]),
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn banner_management_is_admin_only_and_validated() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let customer = app.register_customer("peek@example.com").await;

    let (status, _) = app
        .post(
            "/api/admin/banners",
            json!({"title": "Mine", "position": "HERO"}),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/admin/banners",
            json!({"title": "", "position": "HERO"}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/admin/banners",
            json!({"title": "Sideways", "position": "SIDEBAR"}),
            Some(&admin.token),
        )
        .await;
    assert!(status.is_client_error());

    let (status, _) = app.get("/api/banners?position=SIDEBAR", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admins_moderate_users_and_vendors() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let customer = app.register_customer("member@example.com").await;
    let pending = app.register_vendor("applicant@example.com", "Nyamirambo Crafts").await;

    let (status, users) = app.get("/api/admin/users", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["pagination"]["total"], 3);

    let (_, vendors_only) = app
        .get("/api/admin/users?role=VENDOR", Some(&admin.token))
        .await;
    assert_eq!(vendors_only["pagination"]["total"], 1);
    assert_eq!(vendors_only["data"][0]["email"], "applicant@example.com");

    let (status, verified) = app
        .post(
            &format!("/api/admin/users/{}/verify-email", customer.user_id),
            json!({}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["email_verified"], true);

    let (status, queue) = app
        .get("/api/admin/vendors?status=PENDING", Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);
    assert_eq!(queue[0]["business_name"], "Nyamirambo Crafts");

    let (status, _) = app
        .post(
            &format!("/api/admin/vendors/{}/review", pending.vendor_id.unwrap()),
            json!({"decision": "PENDING"}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.approve_vendor(&admin, &pending).await;
    let (_, queue) = app
        .get("/api/admin/vendors?status=PENDING", Some(&admin.token))
        .await;
    assert!(queue.as_array().unwrap().is_empty());

    for session in [&customer, &pending] {
        let (status, _) = app.get("/api/admin/users", Some(&session.token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn dashboards_summarise_sales() {
    let app = TestApp::new().await;
    let shop = app.storefront("3000", 10).await;
    let scarce = app
        .create_product(&shop.vendor, shop.category_id, "Imigongo Panel", "45000", 2)
        .await;
    app.register_vendor("waiting@example.com", "Waiting Shop").await;
    let buyer = app.register_customer("dash@example.com").await;

    let (_, paid) = app
        .place_order(&buyer, json!([{"product_id": shop.product_id, "quantity": 2}]))
        .await;
    let paid_id = paid["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .post(
            &format!("/api/orders/{paid_id}/payments"),
            json!({"amount": "6000", "provider": "mtn_momo"}),
            Some(&buyer.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.place_order(&buyer, json!([{"product_id": shop.product_id, "quantity": 1}]))
        .await;
    let (_, cancelled) = app
        .place_order(&buyer, json!([{"product_id": scarce["id"], "quantity": 1}]))
        .await;
    app.post(
        &format!("/api/orders/{}/cancel", cancelled["id"].as_str().unwrap()),
        json!({}),
        Some(&buyer.token),
    )
    .await;

    let (status, overview) = app
        .get("/api/admin/analytics/overview", Some(&shop.admin.token))
        .await;
    assert_eq!(status, StatusCode::OK, "{overview}");
    assert_eq!(overview["users_by_role"]["ADMIN"], 1);
    assert_eq!(overview["users_by_role"]["VENDOR"], 2);
    assert_eq!(overview["users_by_role"]["CUSTOMER"], 1);
    assert_eq!(overview["vendors_by_status"]["APPROVED"], 1);
    assert_eq!(overview["vendors_by_status"]["PENDING"], 1);
    assert_eq!(overview["product_count"], 2);
    assert_eq!(overview["orders_by_status"]["PAID"], 1);
    assert_eq!(overview["orders_by_status"]["PENDING"], 1);
    assert_eq!(overview["orders_by_status"]["CANCELLED"], 1);
    assert_eq!(decimal_field(&overview["revenue"]), dec!(6000));
    assert_eq!(decimal_field(&overview["average_order_value"]), dec!(6000));

    let top = overview["top_products"].as_array().unwrap();
    assert_eq!(top.len(), 1, "cancelled lines are not sales");
    assert_eq!(top[0]["name"], "Solar Lamp");
    assert_eq!(top[0]["units_sold"], 3);
    assert_eq!(decimal_field(&top[0]["revenue"]), dec!(9000));

    let (status, mine) = app
        .get("/api/vendors/me/analytics", Some(&shop.vendor.token))
        .await;
    assert_eq!(status, StatusCode::OK, "{mine}");
    assert_eq!(mine["product_count"], 2);
    assert_eq!(mine["orders_count"], 2);
    assert_eq!(mine["units_sold"], 3);
    assert_eq!(decimal_field(&mine["gross_sales"]), dec!(9000));
    let low = mine["low_stock"].as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["name"], "Imigongo Panel");
    assert_eq!(low[0]["stock"], 2);

    let (status, _) = app
        .get("/api/admin/analytics/overview", Some(&shop.vendor.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");
    assert!(body["version"].is_string());
    assert!(body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Iwanyu Marketplace API");
    assert!(body["paths"]["/api/products"].is_object());
}
