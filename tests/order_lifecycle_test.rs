//! Checkout, stock reservation and the order status lifecycle.

mod common;

use axum::http::StatusCode;
use common::{decimal_field, uuid_field, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn checkout_prices_lines_and_reserves_stock() {
    let app = TestApp::new().await;
    let shop = app.storefront("2500", 10).await;
    let speaker = app
        .create_product(&shop.vendor, shop.category_id, "Bluetooth Speaker", "18000.50", 4)
        .await;
    let speaker_id = uuid_field(&speaker["id"]);
    let customer = app.register_customer("buyer@example.com").await;

    let (status, order) = app
        .place_order(
            &customer,
            json!([
                {"product_id": shop.product_id, "quantity": 2},
                {"product_id": speaker_id, "quantity": 1},
                {"product_id": shop.product_id, "quantity": 1}
            ]),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["currency"], "RWF");
    assert_eq!(order["user_id"], customer.user_id.to_string());
    assert_eq!(decimal_field(&order["total"]), dec!(25500.50));

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2, "repeated lines are merged");
    let lamp_line = items
        .iter()
        .find(|i| i["product_id"] == shop.product_id.to_string())
        .unwrap();
    assert_eq!(lamp_line["quantity"], 3);
    assert_eq!(lamp_line["product_name"], "Solar Lamp");
    assert_eq!(decimal_field(&lamp_line["line_total"]), dec!(7500));

    assert_eq!(app.product_stock(shop.product_id).await, 7);
    assert_eq!(app.product_stock(speaker_id).await, 3);

    let (status, mine) = app.get("/api/orders", Some(&customer.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn variant_lines_use_the_variant_price_and_stock() {
    let app = TestApp::new().await;
    let shop = app.storefront("300000", 10).await;
    let (status, variant) = app
        .post(
            &format!("/api/products/{}/variants", shop.product_id),
            json!({"name": "Storage", "value": "256GB", "price_delta": "50000", "stock": 1}),
            Some(&shop.vendor.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let variant_id = uuid_field(&variant["id"]);
    let customer = app.register_customer("variant@example.com").await;

    let (status, body) = app
        .place_order(
            &customer,
            json!([{"product_id": shop.product_id, "variant_id": variant_id, "quantity": 2}]),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, order) = app
        .place_order(
            &customer,
            json!([{"product_id": shop.product_id, "variant_id": variant_id, "quantity": 1}]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decimal_field(&order["total"]), dec!(350000));
    assert_eq!(order["items"][0]["variant_label"], "Storage: 256GB");
    assert_eq!(app.product_stock(shop.product_id).await, 9);
}

#[tokio::test]
async fn insufficient_stock_rejects_the_whole_order() {
    let app = TestApp::new().await;
    let shop = app.storefront("1000", 5).await;
    let scarce = app
        .create_product(&shop.vendor, shop.category_id, "Rare Basket", "9000", 1)
        .await;
    let scarce_id = uuid_field(&scarce["id"]);
    let customer = app.register_customer("greedy@example.com").await;

    let (status, body) = app
        .place_order(
            &customer,
            json!([
                {"product_id": shop.product_id, "quantity": 2},
                {"product_id": scarce_id, "quantity": 2}
            ]),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("Rare Basket"));
    assert_eq!(app.product_stock(shop.product_id).await, 5, "earlier lines roll back");
    assert_eq!(app.product_stock(scarce_id).await, 1);

    let (_, mine) = app.get("/api/orders", Some(&customer.token)).await;
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn checkout_input_is_validated() {
    let app = TestApp::new().await;
    let shop = app.storefront("1000", 5).await;
    let customer = app.register_customer("checker@example.com").await;

    let (status, _) = app.place_order(&customer, json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .place_order(&customer, json!([{"product_id": shop.product_id, "quantity": 0}]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .place_order(&customer, json!([{"product_id": Uuid::new_v4(), "quantity": 1}]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/orders",
            json!({"items": [{"product_id": shop.product_id, "quantity": 1}], "shipping_address": ""}),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .place_order(&shop.vendor, json!([{"product_id": shop.product_id, "quantity": 1}]))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "only customers check out");

    assert_eq!(app.product_stock(shop.product_id).await, 5);
}

#[tokio::test]
async fn orders_are_private_to_buyer_vendor_and_admin() {
    let app = TestApp::new().await;
    let shop = app.storefront("1000", 5).await;
    let buyer = app.register_customer("owner@example.com").await;
    let stranger = app.register_customer("stranger@example.com").await;
    let rival = app.approved_vendor(&shop.admin, "rival@example.com").await;

    let (_, order) = app
        .place_order(&buyer, json!([{"product_id": shop.product_id, "quantity": 1}]))
        .await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    for session in [&buyer, &shop.vendor, &shop.admin] {
        let (status, _) = app.get(&uri, Some(&session.token)).await;
        assert_eq!(status, StatusCode::OK);
    }
    for session in [&stranger, &rival] {
        let (status, _) = app.get(&uri, Some(&session.token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = app
        .get(&format!("/api/orders/{}", Uuid::new_v4()), Some(&buyer.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelling_restocks_once() {
    let app = TestApp::new().await;
    let shop = app.storefront("1000", 5).await;
    let buyer = app.register_customer("cancel@example.com").await;
    let other = app.register_customer("other@example.com").await;

    let (_, order) = app
        .place_order(&buyer, json!([{"product_id": shop.product_id, "quantity": 3}]))
        .await;
    let cancel_uri = format!("/api/orders/{}/cancel", order["id"].as_str().unwrap());
    assert_eq!(app.product_stock(shop.product_id).await, 2);

    let (status, _) = app.post(&cancel_uri, json!({}), Some(&other.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&cancel_uri, json!({}), Some(&buyer.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(app.product_stock(shop.product_id).await, 5);

    let (status, _) = app.post(&cancel_uri, json!({}), Some(&buyer.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.product_stock(shop.product_id).await, 5);
}

#[tokio::test]
async fn fulfilment_moves_forward_only() {
    let app = TestApp::new().await;
    let shop = app.storefront("4000", 5).await;
    let buyer = app.register_customer("ship@example.com").await;

    let (_, order) = app
        .place_order(&buyer, json!([{"product_id": shop.product_id, "quantity": 1}]))
        .await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/orders/{order_id}/status");

    let (status, _) = app
        .put(&status_uri, json!({"status": "PAID"}), Some(&shop.admin.token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "PAID comes from a payment");

    let (status, _) = app
        .put(&status_uri, json!({"status": "SHIPPED"}), Some(&shop.vendor.token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(&status_uri, json!({"status": "PROCESSING"}), Some(&buyer.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/api/orders/{order_id}/payments"),
            json!({"amount": "4000", "provider": "mtn_momo"}),
            Some(&buyer.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    for next in ["PROCESSING", "SHIPPED"] {
        let (status, body) = app
            .put(&status_uri, json!({"status": next}), Some(&shop.vendor.token))
            .await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
        assert_eq!(body["status"], next);
    }

    let (status, _) = app
        .post(&format!("/api/orders/{order_id}/cancel"), json!({}), Some(&buyer.token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "shipped orders stay shipped");

    let (status, body) = app
        .put(&status_uri, json!({"status": "DELIVERED"}), Some(&shop.admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DELIVERED");
    assert!(body["delivered_at"].is_string());
    assert!(body["paid_at"].is_string());

    let (status, _) = app
        .put(&status_uri, json!({"status": "CANCELLED"}), Some(&shop.admin.token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vendors_see_and_update_only_their_lines() {
    let app = TestApp::new().await;
    let shop = app.storefront("1000", 10).await;
    let second = app.approved_vendor(&shop.admin, "second@example.com").await;
    let basket = app
        .create_product(&second, shop.category_id, "Agaseke Basket", "7000", 10)
        .await;
    let buyer = app.register_customer("mixed@example.com").await;

    let (_, order) = app
        .place_order(
            &buyer,
            json!([
                {"product_id": shop.product_id, "quantity": 2},
                {"product_id": basket["id"], "quantity": 1}
            ]),
        )
        .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, listing) = app.get("/api/vendors/me/orders", Some(&second.token)).await;
    assert_eq!(status, StatusCode::OK);
    let listing = listing.as_array().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0]["order_id"], order_id);
    assert_eq!(listing[0]["items"].as_array().unwrap().len(), 1);
    assert_eq!(decimal_field(&listing[0]["vendor_subtotal"]), dec!(7000));

    let (status, _) = app
        .put(
            &format!("/api/orders/{order_id}/status"),
            json!({"status": "CANCELLED"}),
            Some(&second.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "mixed orders belong to admins");

    let (status, body) = app
        .put(
            &format!("/api/orders/{order_id}/status"),
            json!({"status": "CANCELLED"}),
            Some(&shop.admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(app.product_stock(shop.product_id).await, 10);
    assert_eq!(app.product_stock(uuid_field(&basket["id"])).await, 10);
}

#[tokio::test]
async fn admins_page_through_every_order() {
    let app = TestApp::new().await;
    let shop = app.storefront("1000", 10).await;
    let buyer = app.register_customer("pages@example.com").await;
    for _ in 0..3 {
        let (status, _) = app
            .place_order(&buyer, json!([{"product_id": shop.product_id, "quantity": 1}]))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .get("/api/admin/orders?per_page=2&page=2", Some(&shop.admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 3);

    let (_, body) = app
        .get("/api/admin/orders?status=PAID", Some(&shop.admin.token))
        .await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = app.get("/api/admin/orders", Some(&buyer.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
