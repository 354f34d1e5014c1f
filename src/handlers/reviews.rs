use super::common::{AppJson, AppPath};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::reviews::{CreateReviewInput, ReviewList, ReviewResponse},
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<CreateReviewInput>,
) -> Result<(StatusCode, Json<ReviewResponse>), ServiceError> {
    let review = state
        .services
        .reviews
        .create_review(&user, product_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> Result<Json<ReviewList>, ServiceError> {
    Ok(Json(state.services.reviews.list_reviews(product_id).await?))
}

pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(review_id): AppPath<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .reviews
        .delete_review(&user, review_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
