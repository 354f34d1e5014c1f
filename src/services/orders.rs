use crate::{
    auth::AuthUser,
    entities::{order, order_item, product, product_variant, vendor, OrderStatus, Role},
    errors::ServiceError,
    services::{
        vendors::{approved_vendor_for, vendor_for_user},
        Page,
    },
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderInput {
    #[validate]
    pub items: Vec<OrderLineInput>,
    #[validate(length(min = 5, max = 500, message = "must be 5-500 characters"))]
    pub shipping_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusInput {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub vendor_id: Uuid,
    pub product_name: String,
    pub variant_label: Option<String>,
    pub quantity: i32,
    /// Unit price captured at checkout
    pub price: Decimal,
    pub line_total: Decimal,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        let line_total = model.line_total();
        Self {
            id: model.id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            vendor_id: model.vendor_id,
            product_name: model.product_name,
            variant_label: model.variant_label,
            quantity: model.quantity,
            price: model.price,
            line_total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total: Decimal,
    pub currency: String,
    pub shipping_address: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    fn new(model: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            total: model.total,
            currency: model.currency,
            shipping_address: model.shipping_address,
            paid_at: model.paid_at,
            delivered_at: model.delivered_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// An order as seen by one of its vendors: only that vendor's lines.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorOrderResponse {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub currency: String,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    pub vendor_subtotal: Decimal,
}

pub fn unit_price(product_price: Decimal, variant_delta: Option<Decimal>) -> Decimal {
    product_price + variant_delta.unwrap_or(Decimal::ZERO)
}

/// Σ price × quantity over order lines.
pub fn order_total(lines: &[(Decimal, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(price, quantity)| *price * Decimal::from(*quantity))
        .sum()
}

/// Collapses repeated (product, variant) lines into one, keeping first-seen order.
pub fn merge_lines(lines: Vec<OrderLineInput>) -> Result<Vec<OrderLineInput>, ServiceError> {
    let mut merged: Vec<OrderLineInput> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged
            .iter_mut()
            .find(|m| m.product_id == line.product_id && m.variant_id == line.variant_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    ServiceError::BadRequest("Order quantity is too large".to_string())
                })?;
            }
            None => merged.push(line),
        }
    }
    Ok(merged)
}

/// Puts the stock of every line back. Used by cancellation and refunds.
pub(crate) async fn restock_order<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(db)
        .await?;

    for item in items {
        product::Entity::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(item.quantity),
            )
            .filter(product::Column::Id.eq(item.product_id))
            .exec(db)
            .await?;
        if let Some(variant_id) = item.variant_id {
            product_variant::Entity::update_many()
                .col_expr(
                    product_variant::Column::Stock,
                    Expr::col(product_variant::Column::Stock).add(item.quantity),
                )
                .filter(product_variant::Column::Id.eq(variant_id))
                .exec(db)
                .await?;
        }
    }
    Ok(())
}

/// Checkout and order lifecycle
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    currency: String,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, currency: String) -> Self {
        Self { db, currency }
    }

    /// Prices, reserves stock and records the order in one transaction.
    /// Any insufficient line aborts the whole order.
    #[instrument(skip(self, user, input), fields(user_id = %user.user_id, lines = input.items.len()))]
    pub async fn place_order(
        &self,
        user: &AuthUser,
        input: PlaceOrderInput,
    ) -> Result<OrderResponse, ServiceError> {
        if user.role != Role::Customer {
            return Err(ServiceError::Forbidden(
                "Only customers can place orders".to_string(),
            ));
        }
        if input.items.is_empty() {
            return Err(ServiceError::BadRequest(
                "Order must contain at least one item".to_string(),
            ));
        }
        input.validate()?;
        let lines = merge_lines(input.items)?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let mut items: Vec<order_item::ActiveModel> = Vec::with_capacity(lines.len());
        let mut priced: Vec<(Decimal, i32)> = Vec::with_capacity(lines.len());

        for line in &lines {
            let product = product::Entity::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| {
                    ServiceError::BadRequest(format!("Product {} is not available", line.product_id))
                })?;
            let vendor_ok = vendor::Entity::find_by_id(product.vendor_id)
                .one(&txn)
                .await?
                .map(|v| v.is_approved())
                .unwrap_or(false);
            if !vendor_ok {
                return Err(ServiceError::BadRequest(format!(
                    "Product '{}' is not available",
                    product.name
                )));
            }

            let variant = match line.variant_id {
                Some(variant_id) => Some(
                    product_variant::Entity::find_by_id(variant_id)
                        .one(&txn)
                        .await?
                        .filter(|v| v.product_id == product.id)
                        .ok_or_else(|| {
                            ServiceError::BadRequest(format!(
                                "Variant {} does not belong to '{}'",
                                variant_id, product.name
                            ))
                        })?,
                ),
                None => None,
            };

            let reserved = product::Entity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(line.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(product.id))
                .filter(product::Column::Stock.gte(line.quantity))
                .exec(&txn)
                .await?;
            if reserved.rows_affected == 0 {
                counter!("iwanyu_orders.rejected", 1, "reason" => "insufficient_stock");
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for '{}': requested {}, available {}",
                    product.name, line.quantity, product.stock
                )));
            }

            if let Some(variant) = &variant {
                let reserved = product_variant::Entity::update_many()
                    .col_expr(
                        product_variant::Column::Stock,
                        Expr::col(product_variant::Column::Stock).sub(line.quantity),
                    )
                    .filter(product_variant::Column::Id.eq(variant.id))
                    .filter(product_variant::Column::Stock.gte(line.quantity))
                    .exec(&txn)
                    .await?;
                if reserved.rows_affected == 0 {
                    counter!("iwanyu_orders.rejected", 1, "reason" => "insufficient_stock");
                    return Err(ServiceError::InsufficientStock(format!(
                        "Insufficient stock for '{}' ({}): requested {}, available {}",
                        product.name,
                        variant.label(),
                        line.quantity,
                        variant.stock
                    )));
                }
            }

            let price = unit_price(product.price, variant.as_ref().map(|v| v.price_delta)).round_dp(2);
            priced.push((price, line.quantity));
            items.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                variant_id: Set(variant.as_ref().map(|v| v.id)),
                vendor_id: Set(product.vendor_id),
                product_name: Set(product.name.clone()),
                variant_label: Set(variant.as_ref().map(|v| v.label())),
                quantity: Set(line.quantity),
                price: Set(price),
                created_at: Set(now),
            });
        }

        let total = order_total(&priced);
        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user.user_id),
            total: Set(total),
            currency: Set(self.currency.clone()),
            status: Set(OrderStatus::Pending),
            shipping_address: Set(input.shipping_address.trim().to_string()),
            paid_at: Set(None),
            delivered_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            saved.push(item.insert(&txn).await?);
        }
        txn.commit().await?;

        counter!("iwanyu_orders.placed", 1);
        info!(order_id = %order.id, %total, "order placed");
        Ok(OrderResponse::new(order, saved))
    }

    #[instrument(skip(self))]
    pub async fn list_my_orders(&self, user_id: Uuid) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.with_items(orders).await
    }

    /// Visible to the buyer, admins, and vendors with a line in the order.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn get_order(&self, user: &AuthUser, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = self.find(order_id).await?;
        let items = self.items_of(order.id).await?;

        if order.user_id != user.user_id && !user.is_admin() {
            let vendor_id = match user.role {
                Role::Vendor => vendor_for_user(&*self.db, user.user_id).await?.map(|v| v.id),
                _ => None,
            };
            let involved = vendor_id
                .map(|vid| items.iter().any(|i| i.vendor_id == vid))
                .unwrap_or(false);
            if !involved {
                return Err(ServiceError::Forbidden(
                    "You do not have access to this order".to_string(),
                ));
            }
        }

        Ok(OrderResponse::new(order, items))
    }

    /// Buyers cancel while PENDING or PAID; admins cancel anything not yet final.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn cancel_order(&self, user: &AuthUser, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;

        if user.is_admin() {
            if order.status.is_terminal() {
                return Err(ServiceError::InvalidOperation(format!(
                    "Order is already {:?}",
                    order.status
                )));
            }
        } else if order.user_id == user.user_id {
            if !order.status.can_transition_to(OrderStatus::Cancelled) {
                return Err(ServiceError::InvalidOperation(
                    "Only pending or paid orders can be cancelled".to_string(),
                ));
            }
        } else {
            return Err(ServiceError::Forbidden(
                "You do not have access to this order".to_string(),
            ));
        }

        restock_order(&txn, order.id).await?;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        let order = active.update(&txn).await?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;
        txn.commit().await?;

        counter!("iwanyu_orders.cancelled", 1);
        info!(%order_id, "order cancelled");
        Ok(OrderResponse::new(order, items))
    }

    /// Moves an order along its lifecycle. PAID is reached only through a payment.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn update_status(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        if status == OrderStatus::Paid {
            return Err(ServiceError::InvalidOperation(
                "Orders become PAID when a payment is recorded".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;

        if !user.is_admin() {
            if user.role != Role::Vendor {
                return Err(ServiceError::Forbidden(
                    "Only admins and vendors can update order status".to_string(),
                ));
            }
            let vendor = approved_vendor_for(&txn, user.user_id).await?;
            if items.is_empty() || items.iter().any(|i| i.vendor_id != vendor.id) {
                warn!(%order_id, vendor_id = %vendor.id, "vendor does not own every line");
                return Err(ServiceError::Forbidden(
                    "Vendors can only update orders made up entirely of their products"
                        .to_string(),
                ));
            }
        }

        if !order.status.can_transition_to(status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot move order from {:?} to {:?}",
                order.status, status
            )));
        }

        if status == OrderStatus::Cancelled {
            restock_order(&txn, order.id).await?;
        }

        let now = Utc::now();
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        if status == OrderStatus::Delivered {
            active.delivered_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        let order = active.update(&txn).await?;
        txn.commit().await?;

        info!(%order_id, status = ?order.status, "order status updated");
        Ok(OrderResponse::new(order, items))
    }

    /// Orders containing the caller's products, newest first.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn vendor_orders(&self, user: &AuthUser) -> Result<Vec<VendorOrderResponse>, ServiceError> {
        let vendor = vendor_for_user(&*self.db, user.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Vendor profile"))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::VendorId.eq(vendor.id))
            .all(&*self.db)
            .await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_order: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        let orders = order::Entity::find()
            .filter(order::Column::Id.is_in(by_order.keys().copied()))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(orders
            .into_iter()
            .map(|o| {
                let items = by_order.remove(&o.id).unwrap_or_default();
                let vendor_subtotal = items.iter().map(|i| i.line_total()).sum();
                VendorOrderResponse {
                    order_id: o.id,
                    customer_id: o.user_id,
                    status: o.status,
                    currency: o.currency,
                    shipping_address: o.shipping_address,
                    created_at: o.created_at,
                    items: items.into_iter().map(OrderItemResponse::from).collect(),
                    vendor_subtotal,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<OrderResponse>, ServiceError> {
        let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page {
            items: self.with_items(orders).await?,
            total,
            page,
            per_page,
        })
    }

    async fn find(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))
    }

    async fn items_of(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn with_items(&self, orders: Vec<order::Model>) -> Result<Vec<OrderResponse>, ServiceError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        for item in order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(ids))
            .all(&*self.db)
            .await?
        {
            items.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|o| {
                let lines = items.remove(&o.id).unwrap_or_default();
                OrderResponse::new(o, lines)
            })
            .collect())
    }
}
