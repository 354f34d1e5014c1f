use crate::{
    entities::{banner, BannerPosition},
    errors::ServiceError,
    services::clean_optional,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BannerResponse {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: BannerPosition,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<banner::Model> for BannerResponse {
    fn from(model: banner::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            subtitle: model.subtitle,
            image_url: model.image_url,
            link_url: model.link_url,
            position: model.position,
            is_active: model.is_active,
            sort_order: model.sort_order,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBannerInput {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub title: String,
    #[validate(length(max = 240))]
    pub subtitle: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(length(max = 500))]
    pub link_url: Option<String>,
    pub position: BannerPosition,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBannerInput {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 240))]
    pub subtitle: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(length(max = 500))]
    pub link_url: Option<String>,
    pub position: Option<BannerPosition>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Clone)]
pub struct BannerService {
    db: Arc<DatabaseConnection>,
}

impl BannerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_active_banners(
        &self,
        position: Option<BannerPosition>,
    ) -> Result<Vec<BannerResponse>, ServiceError> {
        let mut query = banner::Entity::find().filter(banner::Column::IsActive.eq(true));
        if let Some(position) = position {
            query = query.filter(banner::Column::Position.eq(position));
        }
        Ok(query
            .order_by_asc(banner::Column::SortOrder)
            .order_by_asc(banner::Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(BannerResponse::from)
            .collect())
    }

    /// Every banner including inactive ones, for the admin dashboard.
    #[instrument(skip(self))]
    pub async fn list_all_banners(&self) -> Result<Vec<BannerResponse>, ServiceError> {
        Ok(banner::Entity::find()
            .order_by_asc(banner::Column::Position)
            .order_by_asc(banner::Column::SortOrder)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(BannerResponse::from)
            .collect())
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_banner(&self, input: CreateBannerInput) -> Result<BannerResponse, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let banner = banner::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.trim().to_string()),
            subtitle: Set(clean_optional(input.subtitle)),
            image_url: Set(clean_optional(input.image_url)),
            link_url: Set(clean_optional(input.link_url)),
            position: Set(input.position),
            is_active: Set(input.is_active),
            sort_order: Set(input.sort_order),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(banner_id = %banner.id, "banner created");
        Ok(banner.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_banner(
        &self,
        banner_id: Uuid,
        input: UpdateBannerInput,
    ) -> Result<BannerResponse, ServiceError> {
        input.validate()?;
        let banner = self.find(banner_id).await?;
        let mut active: banner::ActiveModel = banner.into();

        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if input.subtitle.is_some() {
            active.subtitle = Set(clean_optional(input.subtitle));
        }
        if input.image_url.is_some() {
            active.image_url = Set(clean_optional(input.image_url));
        }
        if input.link_url.is_some() {
            active.link_url = Set(clean_optional(input.link_url));
        }
        if let Some(position) = input.position {
            active.position = Set(position);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(sort_order) = input.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_banner(&self, banner_id: Uuid) -> Result<(), ServiceError> {
        let result = banner::Entity::delete_by_id(banner_id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Banner"));
        }
        info!(%banner_id, "banner deleted");
        Ok(())
    }

    async fn find(&self, banner_id: Uuid) -> Result<banner::Model, ServiceError> {
        banner::Entity::find_by_id(banner_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Banner"))
    }
}
