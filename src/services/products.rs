use crate::{
    auth::AuthUser,
    entities::{category, order_item, product, product_image, product_variant, vendor, VendorStatus},
    errors::ServiceError,
    services::{
        clean_optional,
        reviews::{rating_summary, RatingSummary},
        slugify,
        vendors::approved_vendor_for,
        Page,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must not be negative"));
    }
    Ok(())
}

/// Listing sort order. Newest first unless asked otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl FromStr for ProductSort {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(Self::Newest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "name" => Ok(Self::Name),
            other => Err(ServiceError::BadRequest(format!(
                "Unknown sort '{}'; expected newest, price_asc, price_desc or name",
                other
            ))),
        }
    }
}

/// Storefront listing filters
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub tag: Option<String>,
    pub sort: ProductSort,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i32,
    pub tags: Vec<String>,
    pub is_active: bool,
    /// First image by position
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductSummary {
    fn new(model: product::Model, image_url: Option<String>) -> Self {
        let tags = model.tag_list();
        Self {
            id: model.id,
            vendor_id: model.vendor_id,
            category_id: model.category_id,
            name: model.name,
            slug: model.slug,
            price: model.price,
            stock: model.stock,
            tags,
            is_active: model.is_active,
            image_url,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    pub id: Uuid,
    pub url: String,
    pub alt: Option<String>,
    pub position: i32,
}

impl From<product_image::Model> for ImageResponse {
    fn from(model: product_image::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            alt: model.alt,
            position: model.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantResponse {
    pub id: Uuid,
    pub name: String,
    pub value: String,
    pub price_delta: Decimal,
    pub stock: i32,
}

impl From<product_variant::Model> for VariantResponse {
    fn from(model: product_variant::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            value: model.value,
            price_delta: model.price_delta,
            stock: model.stock,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorBrief {
    pub id: Uuid,
    pub business_name: String,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryBrief {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Full product page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vendor: VendorBrief,
    pub category: CategoryBrief,
    pub images: Vec<ImageResponse>,
    pub variants: Vec<VariantResponse>,
    pub rating: RatingSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewImageInput {
    #[validate(url(message = "must be a valid URL"))]
    pub url: String,
    #[validate(length(max = 200))]
    pub alt: Option<String>,
    /// Appended after existing images when omitted
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewVariantInput {
    #[validate(length(min = 1, max = 60, message = "must be 1-60 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 60, message = "must be 1-60 characters"))]
    pub value: String,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub price_delta: Decimal,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 2, max = 200, message = "must be 2-200 characters"))]
    pub name: String,
    /// Derived from the name when omitted
    #[validate(length(max = 220))]
    pub slug: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: i32,
    pub category_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate]
    pub images: Vec<NewImageInput>,
    #[serde(default)]
    #[validate]
    pub variants: Vec<NewVariantInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 2, max = 200, message = "must be 2-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustStockInput {
    /// Signed change applied to the current stock
    pub delta: i32,
}

/// New stock after applying `delta`; `None` if it would go negative or overflow.
pub fn apply_stock_delta(current: i32, delta: i32) -> Option<i32> {
    current.checked_add(delta).filter(|s| *s >= 0)
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Active products of approved vendors.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<ProductSummary>, ServiceError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(ServiceError::BadRequest(
                    "min_price must not exceed max_price".to_string(),
                ));
            }
        }

        let mut query = product::Entity::find()
            .inner_join(vendor::Entity)
            .filter(vendor::Column::Status.eq(VendorStatus::Approved))
            .filter(product::Column::IsActive.eq(true));

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            product::Entity,
                            product::Column::Name,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            product::Entity,
                            product::Column::Description,
                        ))))
                        .like(pattern),
                    ),
            );
        }
        if let Some(slug) = filter.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query
                .inner_join(category::Entity)
                .filter(category::Column::Slug.eq(slug.to_lowercase()));
        }
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(product::Column::VendorId.eq(vendor_id));
        }
        if let Some(min) = filter.min_price {
            query = query.filter(product::Column::Price.gte(min));
        }
        if let Some(max) = filter.max_price {
            query = query.filter(product::Column::Price.lte(max));
        }
        if let Some(tag) = filter.tag.as_deref().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Tags.eq(tag.clone()))
                    .add(product::Column::Tags.like(format!("{},%", tag)))
                    .add(product::Column::Tags.like(format!("%,{}", tag)))
                    .add(product::Column::Tags.like(format!("%,{},%", tag))),
            );
        }

        query = match filter.sort {
            ProductSort::Newest => query.order_by_desc(product::Column::CreatedAt),
            ProductSort::PriceAsc => query.order_by_asc(product::Column::Price),
            ProductSort::PriceDesc => query.order_by_desc(product::Column::Price),
            ProductSort::Name => query.order_by_asc(product::Column::Name),
        }
        .order_by_asc(product::Column::Id);

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        let items = self.summaries(products).await?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Looks a product up by id or slug. Hidden products 404.
    #[instrument(skip(self))]
    pub async fn get_product(&self, key: &str) -> Result<ProductDetail, ServiceError> {
        let product = match Uuid::parse_str(key) {
            Ok(id) => product::Entity::find_by_id(id).one(&*self.db).await?,
            Err(_) => {
                product::Entity::find()
                    .filter(product::Column::Slug.eq(key.trim().to_lowercase()))
                    .one(&*self.db)
                    .await?
            }
        }
        .ok_or_else(|| ServiceError::not_found("Product"))?;

        let detail = self.detail(product).await?;
        if !detail.is_active {
            return Err(ServiceError::not_found("Product"));
        }
        let vendor = vendor::Entity::find_by_id(detail.vendor.id)
            .one(&*self.db)
            .await?;
        if !vendor.map(|v| v.is_approved()).unwrap_or(false) {
            return Err(ServiceError::not_found("Product"));
        }
        Ok(detail)
    }

    /// Creates a product with its images and variants for the caller's approved vendor.
    #[instrument(skip(self, user, input), fields(user_id = %user.user_id, name = %input.name))]
    pub async fn create_product(
        &self,
        user: &AuthUser,
        input: CreateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        input.validate()?;
        let vendor = approved_vendor_for(&*self.db, user.user_id).await?;
        self.ensure_category(input.category_id).await?;

        let name = input.name.trim().to_string();
        let slug = match input.slug.as_deref().map(slugify) {
            Some(slug) if slug.is_empty() => {
                return Err(ServiceError::ValidationError(
                    "slug: must contain at least one letter or digit".to_string(),
                ))
            }
            Some(slug) => {
                if self.slug_taken(&slug).await? {
                    return Err(ServiceError::Conflict(format!(
                        "Product slug '{}' is already in use",
                        slug
                    )));
                }
                slug
            }
            None => self.unique_slug(&name).await?,
        };

        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let product = product::ActiveModel {
            id: Set(product_id),
            vendor_id: Set(vendor.id),
            category_id: Set(input.category_id),
            name: Set(name),
            slug: Set(slug),
            description: Set(clean_optional(input.description)),
            price: Set(input.price.round_dp(2)),
            stock: Set(input.stock),
            tags: Set(product::join_tags(&input.tags)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (index, image) in input.images.into_iter().enumerate() {
            let position = image.position.unwrap_or(index as i32);
            insert_image(&txn, product_id, image, position).await?;
        }
        for variant in input.variants {
            insert_variant(&txn, product_id, variant).await?;
        }
        txn.commit().await?;

        info!(product_id = %product.id, vendor_id = %vendor.id, "product created");
        self.detail(product).await
    }

    #[instrument(skip(self, user, input), fields(user_id = %user.user_id))]
    pub async fn update_product(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        input.validate()?;
        let product = self.load_owned(user, product_id).await?;
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(clean_optional(input.description));
        }
        if let Some(price) = input.price {
            active.price = Set(price.round_dp(2));
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(tags) = input.tags {
            active.tags = Set(product::join_tags(&tags));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let product = active.update(&*self.db).await?;
        info!(product_id = %product.id, "product updated");
        self.detail(product).await
    }

    /// Products referenced by orders are kept for history; deactivate them instead.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete_product(&self, user: &AuthUser, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.load_owned(user, product_id).await?;
        let ordered = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(product.id))
            .count(&*self.db)
            .await?;
        if ordered > 0 {
            return Err(ServiceError::Conflict(
                "Product has been ordered; deactivate it instead".to_string(),
            ));
        }

        product::Entity::delete_by_id(product.id)
            .exec(&*self.db)
            .await?;
        info!(%product_id, "product deleted");
        Ok(())
    }

    /// Applies a signed stock change; the result may not go below zero.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn adjust_stock(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        delta: i32,
    ) -> Result<ProductSummary, ServiceError> {
        let product = self.load_owned(user, product_id).await?;
        let new_stock = apply_stock_delta(product.stock, delta).ok_or_else(|| {
            ServiceError::InsufficientStock(format!(
                "Stock for '{}' cannot go below zero (current {}, change {})",
                product.name, product.stock, delta
            ))
        })?;

        let mut active: product::ActiveModel = product.into();
        active.stock = Set(new_stock);
        active.updated_at = Set(Utc::now());
        let product = active.update(&*self.db).await?;

        info!(%product_id, delta, stock = new_stock, "stock adjusted");
        let image = self.first_images(&[product.id]).await?.remove(&product.id);
        Ok(ProductSummary::new(product, image))
    }

    /// Every product of the caller's vendor, including inactive ones.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list_my_products(&self, user: &AuthUser) -> Result<Vec<ProductSummary>, ServiceError> {
        let vendor = crate::services::vendors::vendor_for_user(&*self.db, user.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Vendor profile"))?;
        let products = product::Entity::find()
            .filter(product::Column::VendorId.eq(vendor.id))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.summaries(products).await
    }

    #[instrument(skip(self, user, input), fields(user_id = %user.user_id))]
    pub async fn add_variant(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        input: NewVariantInput,
    ) -> Result<VariantResponse, ServiceError> {
        input.validate()?;
        let product = self.load_owned(user, product_id).await?;
        let variant = insert_variant(&*self.db, product.id, input).await?;
        Ok(variant.into())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete_variant(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<(), ServiceError> {
        let product = self.load_owned(user, product_id).await?;
        let result = product_variant::Entity::delete_many()
            .filter(product_variant::Column::Id.eq(variant_id))
            .filter(product_variant::Column::ProductId.eq(product.id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Variant"));
        }
        Ok(())
    }

    #[instrument(skip(self, user, input), fields(user_id = %user.user_id))]
    pub async fn add_image(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        input: NewImageInput,
    ) -> Result<ImageResponse, ServiceError> {
        input.validate()?;
        let product = self.load_owned(user, product_id).await?;
        let position = match input.position {
            Some(position) => position,
            None => product_image::Entity::find()
                .filter(product_image::Column::ProductId.eq(product.id))
                .count(&*self.db)
                .await? as i32,
        };
        let image = insert_image(&*self.db, product.id, input, position).await?;
        Ok(image.into())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete_image(
        &self,
        user: &AuthUser,
        product_id: Uuid,
        image_id: Uuid,
    ) -> Result<(), ServiceError> {
        let product = self.load_owned(user, product_id).await?;
        let result = product_image::Entity::delete_many()
            .filter(product_image::Column::Id.eq(image_id))
            .filter(product_image::Column::ProductId.eq(product.id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Image"));
        }
        Ok(())
    }

    /// Admins may touch any product; vendors only their own, and only once approved.
    async fn load_owned(&self, user: &AuthUser, product_id: Uuid) -> Result<product::Model, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product"))?;
        if user.is_admin() {
            return Ok(product);
        }

        let vendor = approved_vendor_for(&*self.db, user.user_id).await?;
        if product.vendor_id != vendor.id {
            warn!(%product_id, vendor_id = %vendor.id, "product belongs to another vendor");
            return Err(ServiceError::Forbidden(
                "You do not own this product".to_string(),
            ));
        }
        Ok(product)
    }

    async fn ensure_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let exists = category::Entity::find_by_id(category_id)
            .count(&*self.db)
            .await?
            > 0;
        if !exists {
            return Err(ServiceError::BadRequest("Category does not exist".to_string()));
        }
        Ok(())
    }

    async fn slug_taken(&self, slug: &str) -> Result<bool, ServiceError> {
        Ok(product::Entity::find()
            .filter(product::Column::Slug.eq(slug))
            .count(&*self.db)
            .await?
            > 0)
    }

    /// Slug from the name, with `-2`, `-3`, ... appended on collision.
    async fn unique_slug(&self, name: &str) -> Result<String, ServiceError> {
        let base = slugify(name);
        if base.is_empty() {
            return Err(ServiceError::ValidationError(
                "name: must contain at least one letter or digit".to_string(),
            ));
        }

        let existing: Vec<String> = product::Entity::find()
            .select_only()
            .column(product::Column::Slug)
            .filter(
                Condition::any()
                    .add(product::Column::Slug.eq(base.clone()))
                    .add(product::Column::Slug.like(format!("{}-%", base))),
            )
            .into_tuple::<String>()
            .all(&*self.db)
            .await?;

        Ok(next_free_slug(&base, &existing))
    }

    async fn first_images(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, ServiceError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let images = product_image::Entity::find()
            .filter(product_image::Column::ProductId.is_in(product_ids.iter().copied()))
            .order_by_asc(product_image::Column::Position)
            .order_by_asc(product_image::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut first = HashMap::new();
        for image in images {
            first.entry(image.product_id).or_insert(image.url);
        }
        Ok(first)
    }

    async fn summaries(&self, products: Vec<product::Model>) -> Result<Vec<ProductSummary>, ServiceError> {
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let mut images = self.first_images(&ids).await?;
        Ok(products
            .into_iter()
            .map(|p| {
                let image = images.remove(&p.id);
                ProductSummary::new(p, image)
            })
            .collect())
    }

    async fn detail(&self, product: product::Model) -> Result<ProductDetail, ServiceError> {
        let vendor = vendor::Entity::find_by_id(product.vendor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InternalError("Product vendor missing".to_string()))?;
        let category = category::Entity::find_by_id(product.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InternalError("Product category missing".to_string()))?;
        let images = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .order_by_asc(product_image::Column::Position)
            .all(&*self.db)
            .await?;
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product.id))
            .order_by_asc(product_variant::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let rating = rating_summary(&*self.db, product.id).await?;
        let tags = product.tag_list();

        Ok(ProductDetail {
            id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            stock: product.stock,
            tags,
            is_active: product.is_active,
            created_at: product.created_at,
            updated_at: product.updated_at,
            vendor: VendorBrief {
                id: vendor.id,
                business_name: vendor.business_name,
                is_verified: vendor.is_verified,
            },
            category: CategoryBrief {
                id: category.id,
                name: category.name,
                slug: category.slug,
            },
            images: images.into_iter().map(ImageResponse::from).collect(),
            variants: variants.into_iter().map(VariantResponse::from).collect(),
            rating,
        })
    }
}

fn next_free_slug(base: &str, existing: &[String]) -> String {
    if !existing.iter().any(|s| s == base) {
        return base.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !existing.iter().any(|s| *s == candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

async fn insert_image<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    input: NewImageInput,
    position: i32,
) -> Result<product_image::Model, ServiceError> {
    Ok(product_image::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        url: Set(input.url.trim().to_string()),
        alt: Set(clean_optional(input.alt)),
        position: Set(position),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?)
}

async fn insert_variant<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    input: NewVariantInput,
) -> Result<product_variant::Model, ServiceError> {
    Ok(product_variant::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        name: Set(input.name.trim().to_string()),
        value: Set(input.value.trim().to_string()),
        price_delta: Set(input.price_delta.round_dp(2)),
        stock: Set(input.stock),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(10, -3, Some(7))]
    #[case(10, -10, Some(0))]
    #[case(10, -11, None)]
    #[case(0, 5, Some(5))]
    #[case(i32::MAX, 1, None)]
    fn stock_delta(#[case] current: i32, #[case] delta: i32, #[case] expected: Option<i32>) {
        assert_eq!(apply_stock_delta(current, delta), expected);
    }

    #[test]
    fn slug_suffix_skips_taken_numbers() {
        let taken = vec!["kitenge".to_string(), "kitenge-2".to_string()];
        assert_eq!(next_free_slug("kitenge", &taken), "kitenge-3");
        assert_eq!(next_free_slug("imigongo", &taken), "imigongo");
    }

    #[rstest]
    #[case("price_desc", ProductSort::PriceDesc)]
    #[case("NAME", ProductSort::Name)]
    #[case("", ProductSort::Newest)]
    fn sort_parses(#[case] raw: &str, #[case] expected: ProductSort) {
        assert_eq!(raw.parse::<ProductSort>().unwrap(), expected);
    }

    #[test]
    fn unknown_sort_is_a_bad_request() {
        assert!(matches!(
            "cheapest".parse::<ProductSort>(),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn negative_price_fails_validation() {
        let input = CreateProductInput {
            name: "Agaseke basket".into(),
            slug: None,
            description: None,
            price: dec!(-1),
            stock: 3,
            category_id: Uuid::new_v4(),
            tags: vec![],
            images: vec![],
            variants: vec![],
        };
        assert!(input.validate().is_err());
    }
}
