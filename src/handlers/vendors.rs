use super::common::{AppJson, AppPath};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::{
        analytics::VendorOverview,
        orders::VendorOrderResponse,
        vendors::{ApplyVendorInput, PublicVendor, UpdateVendorInput, VendorProfile},
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<ApplyVendorInput>,
) -> Result<(StatusCode, Json<VendorProfile>), ServiceError> {
    let vendor = state.services.vendors.apply(&user, input).await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

pub async fn my_vendor(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<VendorProfile>, ServiceError> {
    Ok(Json(state.services.vendors.my_vendor(user.user_id).await?))
}

pub async fn update_my_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<UpdateVendorInput>,
) -> Result<Json<VendorProfile>, ServiceError> {
    Ok(Json(
        state
            .services
            .vendors
            .update_my_vendor(user.user_id, input)
            .await?,
    ))
}

/// Storefront page of an approved vendor
pub async fn get_public_vendor(
    State(state): State<AppState>,
    AppPath(vendor_id): AppPath<Uuid>,
) -> Result<Json<PublicVendor>, ServiceError> {
    Ok(Json(
        state.services.vendors.get_public_vendor(vendor_id).await?,
    ))
}

pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<VendorOrderResponse>>, ServiceError> {
    Ok(Json(state.services.orders.vendor_orders(&user).await?))
}

pub async fn my_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<VendorOverview>, ServiceError> {
    Ok(Json(state.services.analytics.vendor_overview(&user).await?))
}
