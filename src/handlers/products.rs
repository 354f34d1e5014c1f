use super::common::{
    AppJson, AppPath, AppQuery, MessageResponse, PaginatedResponse, PaginationParams,
};
use crate::{
    auth::AuthUser,
    errors::{ErrorResponse, ServiceError},
    handlers::AppState,
    services::products::{
        AdjustStockInput, CreateProductInput, ImageResponse, NewImageInput, NewVariantInput,
        ProductDetail, ProductFilter, ProductSort, ProductSummary, UpdateProductInput,
        VariantResponse,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use utoipa::IntoParams;
use uuid::Uuid;

/// Storefront listing query
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductQuery {
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    /// Category slug
    pub category: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub tag: Option<String>,
    /// newest (default), price_asc, price_desc or name
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn parse_price(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, ServiceError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => Decimal::from_str(value)
            .map(Some)
            .map_err(|_| ServiceError::BadRequest(format!("{} must be a number", field))),
    }
}

impl ProductQuery {
    fn filter(&self) -> Result<ProductFilter, ServiceError> {
        Ok(ProductFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            vendor_id: self.vendor_id,
            min_price: parse_price("min_price", self.min_price.as_deref())?,
            max_price: parse_price("max_price", self.max_price.as_deref())?,
            tag: self.tag.clone(),
            sort: self
                .sort
                .as_deref()
                .map(ProductSort::from_str)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// List active products of approved vendors
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Page of products", body = PaginatedResponse<ProductSummary>),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductQuery>,
) -> Result<Json<PaginatedResponse<ProductSummary>>, ServiceError> {
    let filter = query.filter()?;
    let (page, per_page) = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&state.config);
    let products = state
        .services
        .products
        .list_products(filter, page, per_page)
        .await?;
    Ok(Json(products.into()))
}

/// Product page by id or slug
#[utoipa::path(
    get,
    path = "/api/products/{key}",
    params(("key" = String, Path, description = "Product id or slug")),
    responses(
        (status = 200, description = "Product detail", body = ProductDetail),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    AppPath(key): AppPath<String>,
) -> Result<Json<ProductDetail>, ServiceError> {
    Ok(Json(state.services.products.get_product(&key).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<CreateProductInput>,
) -> Result<(StatusCode, Json<ProductDetail>), ServiceError> {
    let product = state.services.products.create_product(&user, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateProductInput>,
) -> Result<Json<ProductDetail>, ServiceError> {
    Ok(Json(
        state
            .services
            .products
            .update_product(&user, product_id, input)
            .await?,
    ))
}

pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state
        .services
        .products
        .delete_product(&user, product_id)
        .await?;
    Ok(Json(MessageResponse::new("Product deleted")))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<AdjustStockInput>,
) -> Result<Json<ProductSummary>, ServiceError> {
    Ok(Json(
        state
            .services
            .products
            .adjust_stock(&user, product_id, input.delta)
            .await?,
    ))
}

pub async fn add_variant(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<NewVariantInput>,
) -> Result<(StatusCode, Json<VariantResponse>), ServiceError> {
    let variant = state
        .services
        .products
        .add_variant(&user, product_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn delete_variant(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((product_id, variant_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .products
        .delete_variant(&user, product_id, variant_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_image(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<NewImageInput>,
) -> Result<(StatusCode, Json<ImageResponse>), ServiceError> {
    let image = state
        .services
        .products
        .add_image(&user, product_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((product_id, image_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .products
        .delete_image(&user, product_id, image_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own catalog, inactive products included
pub async fn my_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ProductSummary>>, ServiceError> {
    Ok(Json(state.services.products.list_my_products(&user).await?))
}
