use crate::{
    entities::{category, product},
    errors::ServiceError,
    services::{clean_optional, slugify},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Active products in the category
    pub product_count: u64,
    pub created_at: DateTime<Utc>,
}

impl CategoryResponse {
    fn new(model: category::Model, product_count: u64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            product_count,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 80, message = "must be 1-80 characters"))]
    pub name: String,
    /// Derived from the name when omitted
    #[validate(length(max = 100))]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 80, message = "must be 1-80 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

fn category_slug(explicit: Option<&str>, name: &str) -> Result<String, ServiceError> {
    let slug = slugify(explicit.unwrap_or(name));
    if slug.is_empty() {
        return Err(ServiceError::ValidationError(
            "slug: must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(slug)
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryResponse>, ServiceError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?;

        let counts: HashMap<Uuid, i64> = product::Entity::find()
            .select_only()
            .column(product::Column::CategoryId)
            .column_as(Expr::col(product::Column::Id).count(), "product_count")
            .filter(product::Column::IsActive.eq(true))
            .group_by(product::Column::CategoryId)
            .into_tuple::<(Uuid, i64)>()
            .all(&*self.db)
            .await?
            .into_iter()
            .collect();

        Ok(categories
            .into_iter()
            .map(|c| {
                let count = counts.get(&c.id).copied().unwrap_or(0).max(0) as u64;
                CategoryResponse::new(c, count)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, slug: &str) -> Result<CategoryResponse, ServiceError> {
        let category = category::Entity::find()
            .filter(category::Column::Slug.eq(slug.trim().to_lowercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category"))?;
        self.with_count(category).await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryResponse, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        let slug = category_slug(input.slug.as_deref(), &name)?;
        self.ensure_slug_free(&slug, None).await?;

        let now = Utc::now();
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            description: Set(clean_optional(input.description)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(CategoryResponse::new(category, 0))
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryResponse, ServiceError> {
        input.validate()?;
        let category = self.find(category_id).await?;
        let mut active: category::ActiveModel = category.into();

        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(slug) = input.slug {
            let slug = category_slug(Some(&slug), "")?;
            self.ensure_slug_free(&slug, Some(category_id)).await?;
            active.slug = Set(slug);
        }
        if input.description.is_some() {
            active.description = Set(clean_optional(input.description));
        }
        active.updated_at = Set(Utc::now());

        let category = active.update(&*self.db).await?;
        self.with_count(category).await
    }

    /// Categories still holding products cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let category = self.find(category_id).await?;
        let products = product::Entity::find()
            .filter(product::Column::CategoryId.eq(category.id))
            .count(&*self.db)
            .await?;
        if products > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category still has {} product(s)",
                products
            )));
        }

        category::Entity::delete_by_id(category.id)
            .exec(&*self.db)
            .await?;
        info!(%category_id, "category deleted");
        Ok(())
    }

    async fn find(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category"))
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = category::Entity::find().filter(category::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category slug '{}' is already in use",
                slug
            )));
        }
        Ok(())
    }

    async fn with_count(&self, category: category::Model) -> Result<CategoryResponse, ServiceError> {
        let count = product::Entity::find()
            .filter(product::Column::CategoryId.eq(category.id))
            .filter(product::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;
        Ok(CategoryResponse::new(category, count))
    }
}
