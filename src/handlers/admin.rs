use super::common::{AppJson, AppPath, AppQuery, PaginatedResponse, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::{OrderStatus, Role, VendorStatus},
    errors::ServiceError,
    handlers::AppState,
    services::{
        analytics::AdminOverview,
        orders::OrderResponse,
        payments::PaymentResponse,
        users::UserResponse,
        vendors::{ReviewVendorInput, VendorProfile},
    },
};
use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VendorListQuery {
    pub status: Option<VendorStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveInput {
    pub is_active: bool,
}

fn page_bounds(state: &AppState, page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    PaginationParams { page, per_page }.resolve(&state.config)
}

pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ServiceError> {
    let (page, per_page) = page_bounds(&state, query.page, query.per_page);
    let users = state
        .services
        .users
        .list_users(query.role, page, per_page)
        .await?;
    Ok(Json(users.into()))
}

pub async fn set_user_active(
    State(state): State<AppState>,
    admin: AuthUser,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(input): AppJson<SetActiveInput>,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(
        state
            .services
            .users
            .set_user_active(admin.user_id, user_id, input.is_active)
            .await?,
    ))
}

pub async fn verify_email(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(state.services.users.verify_email(user_id).await?))
}

pub async fn list_vendors(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<VendorListQuery>,
) -> Result<Json<Vec<VendorProfile>>, ServiceError> {
    Ok(Json(state.services.vendors.list_vendors(query.status).await?))
}

pub async fn review_vendor(
    State(state): State<AppState>,
    admin: AuthUser,
    AppPath(vendor_id): AppPath<Uuid>,
    AppJson(input): AppJson<ReviewVendorInput>,
) -> Result<Json<VendorProfile>, ServiceError> {
    Ok(Json(
        state
            .services
            .vendors
            .review_vendor(admin.user_id, vendor_id, input)
            .await?,
    ))
}

pub async fn list_all_orders(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> Result<Json<PaginatedResponse<OrderResponse>>, ServiceError> {
    let (page, per_page) = page_bounds(&state, query.page, query.per_page);
    let orders = state
        .services
        .orders
        .list_all_orders(query.status, page, per_page)
        .await?;
    Ok(Json(orders.into()))
}

pub async fn refund_payment(
    State(state): State<AppState>,
    AppPath(order_id): AppPath<Uuid>,
) -> Result<Json<PaymentResponse>, ServiceError> {
    Ok(Json(state.services.payments.refund_payment(order_id).await?))
}

pub async fn analytics_overview(
    State(state): State<AppState>,
) -> Result<Json<AdminOverview>, ServiceError> {
    Ok(Json(state.services.analytics.admin_overview().await?))
}
