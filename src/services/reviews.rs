use crate::{
    auth::AuthUser,
    entities::{product, review, user},
    errors::ServiceError,
    services::clean_optional,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingSummary {
    /// Mean rating rounded to two decimals, zero when unrated
    pub average: Decimal,
    pub count: u64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let average = (Decimal::from(sum) / Decimal::from(ratings.len() as u64)).round_dp(2);
        Self {
            average,
            count: ratings.len() as u64,
        }
    }
}

pub async fn rating_summary<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
) -> Result<RatingSummary, ServiceError> {
    let ratings: Vec<i32> = review::Entity::find()
        .select_only()
        .column(review::Column::Rating)
        .filter(review::Column::ProductId.eq(product_id))
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(RatingSummary::from_ratings(&ratings))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReviewInput {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewResponse {
    fn new(model: review::Model, author_name: String) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            author_name,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewList {
    pub summary: RatingSummary,
    pub reviews: Vec<ReviewResponse>,
}

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// One review per customer and product.
    #[instrument(skip(self, user, input), fields(user_id = %user.user_id))]
    pub async fn create_review(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        input: CreateReviewInput,
    ) -> Result<ReviewResponse, ServiceError> {
        input.validate()?;
        let exists = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .is_some();
        if !exists {
            return Err(ServiceError::not_found("Product"));
        }

        let duplicate = review::Entity::find()
            .filter(review::Column::UserId.eq(user.user_id))
            .filter(review::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .is_some();
        if duplicate {
            return Err(ServiceError::Conflict(
                "You have already reviewed this product".to_string(),
            ));
        }

        let review = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            product_id: Set(product_id),
            rating: Set(input.rating),
            comment: Set(clean_optional(input.comment)),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| match ServiceError::from(e) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict("You have already reviewed this product".to_string())
            }
            other => other,
        })?;

        info!(review_id = %review.id, %product_id, rating = review.rating, "review created");
        Ok(ReviewResponse::new(review, user.name.clone()))
    }

    #[instrument(skip(self))]
    pub async fn list_reviews(&self, product_id: Uuid) -> Result<ReviewList, ServiceError> {
        let reviews = review::Entity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let author_ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
        let authors: HashMap<Uuid, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(author_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect()
        };

        let ratings: Vec<i32> = reviews.iter().map(|r| r.rating).collect();
        let summary = RatingSummary::from_ratings(&ratings);
        let reviews = reviews
            .into_iter()
            .map(|r| {
                let author = authors.get(&r.user_id).cloned().unwrap_or_default();
                ReviewResponse::new(r, author)
            })
            .collect();

        Ok(ReviewList { summary, reviews })
    }

    /// Authors delete their own reviews; admins delete any.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete_review(&self, user: &AuthUser, review_id: Uuid) -> Result<(), ServiceError> {
        let review = review::Entity::find_by_id(review_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Review"))?;
        if review.user_id != user.user_id && !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "You can only delete your own reviews".to_string(),
            ));
        }
        review::Entity::delete_by_id(review.id).exec(&*self.db).await?;
        info!(%review_id, "review deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_summary_is_zero() {
        let summary = RatingSummary::from_ratings(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, Decimal::ZERO);
    }

    #[test]
    fn average_is_rounded() {
        let summary = RatingSummary::from_ratings(&[5, 4, 4]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, dec!(4.33));
    }

    #[test]
    fn rating_bounds_are_validated() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let input = CreateReviewInput {
                rating,
                comment: None,
            };
            assert_eq!(input.validate().is_ok(), ok, "rating {}", rating);
        }
    }
}
