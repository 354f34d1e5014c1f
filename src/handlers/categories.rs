use super::common::{AppJson, AppPath, MessageResponse};
use crate::{
    errors::{ErrorResponse, ServiceError},
    handlers::AppState,
    services::categories::{CategoryResponse, CreateCategoryInput, UpdateCategoryInput},
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

/// All categories with their active product counts
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories", body = Vec<CategoryResponse>)),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ServiceError> {
    Ok(Json(state.services.categories.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<Json<CategoryResponse>, ServiceError> {
    Ok(Json(state.services.categories.get_category(&slug).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateCategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>), ServiceError> {
    let category = state.services.categories.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AppPath(category_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateCategoryInput>,
) -> Result<Json<CategoryResponse>, ServiceError> {
    Ok(Json(
        state
            .services
            .categories
            .update_category(category_id, input)
            .await?,
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AppPath(category_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state
        .services
        .categories
        .delete_category(category_id)
        .await?;
    Ok(Json(MessageResponse::new("Category deleted")))
}
