use super::common::{AppJson, AppPath, AppQuery, MessageResponse};
use crate::{
    entities::BannerPosition,
    errors::ServiceError,
    handlers::AppState,
    services::banners::{BannerResponse, CreateBannerInput, UpdateBannerInput},
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BannerQuery {
    /// HERO, PROMOTIONAL or SECONDARY
    pub position: Option<BannerPosition>,
}

/// Active banners ordered by `sort_order`
#[utoipa::path(
    get,
    path = "/api/banners",
    params(BannerQuery),
    responses((status = 200, description = "Active banners", body = Vec<BannerResponse>)),
    tag = "Banners"
)]
pub async fn list_active_banners(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BannerQuery>,
) -> Result<Json<Vec<BannerResponse>>, ServiceError> {
    Ok(Json(
        state
            .services
            .banners
            .list_active_banners(query.position)
            .await?,
    ))
}

pub async fn list_all_banners(
    State(state): State<AppState>,
) -> Result<Json<Vec<BannerResponse>>, ServiceError> {
    Ok(Json(state.services.banners.list_all_banners().await?))
}

pub async fn create_banner(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateBannerInput>,
) -> Result<(StatusCode, Json<BannerResponse>), ServiceError> {
    let banner = state.services.banners.create_banner(input).await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

pub async fn update_banner(
    State(state): State<AppState>,
    AppPath(banner_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateBannerInput>,
) -> Result<Json<BannerResponse>, ServiceError> {
    Ok(Json(
        state
            .services
            .banners
            .update_banner(banner_id, input)
            .await?,
    ))
}

pub async fn delete_banner(
    State(state): State<AppState>,
    AppPath(banner_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.banners.delete_banner(banner_id).await?;
    Ok(Json(MessageResponse::new("Banner deleted")))
}
