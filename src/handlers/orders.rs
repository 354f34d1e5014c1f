use super::common::{AppJson, AppPath};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::{
        orders::{OrderResponse, PlaceOrderInput, UpdateOrderStatusInput},
        payments::{PaymentResponse, RecordPaymentInput},
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

/// Checkout: prices the cart, reserves stock and records a PENDING order
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<PlaceOrderInput>,
) -> Result<(StatusCode, Json<OrderResponse>), ServiceError> {
    let order = state.services.orders.place_order(&user, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    Ok(Json(
        state.services.orders.list_my_orders(user.user_id).await?,
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(order_id): AppPath<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    Ok(Json(state.services.orders.get_order(&user, order_id).await?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(order_id): AppPath<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    Ok(Json(
        state.services.orders.cancel_order(&user, order_id).await?,
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(order_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateOrderStatusInput>,
) -> Result<Json<OrderResponse>, ServiceError> {
    Ok(Json(
        state
            .services
            .orders
            .update_status(&user, order_id, input.status)
            .await?,
    ))
}

pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(order_id): AppPath<Uuid>,
    AppJson(input): AppJson<RecordPaymentInput>,
) -> Result<(StatusCode, Json<PaymentResponse>), ServiceError> {
    let payment = state
        .services
        .payments
        .record_payment(&user, order_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(order_id): AppPath<Uuid>,
) -> Result<Json<PaymentResponse>, ServiceError> {
    Ok(Json(
        state.services.payments.get_payment(&user, order_id).await?,
    ))
}
