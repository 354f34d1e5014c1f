use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    entities::{
        order, order_item, payment, product, user, vendor, OrderStatus, PaymentStatus, Role,
        VendorStatus,
    },
    errors::ServiceError,
    services::vendors::vendor_for_user,
};

pub const LOW_STOCK_THRESHOLD: i32 = 5;
const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopProduct {
    pub product_id: uuid::Uuid,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LowStockProduct {
    pub id: uuid::Uuid,
    pub name: String,
    pub stock: i32,
}

/// Marketplace-wide figures for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminOverview {
    pub users_by_role: BTreeMap<String, u64>,
    pub vendors_by_status: BTreeMap<String, u64>,
    pub product_count: u64,
    pub orders_by_status: BTreeMap<String, u64>,
    /// Sum of completed payments
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub top_products: Vec<TopProduct>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorOverview {
    pub vendor_id: uuid::Uuid,
    pub product_count: u64,
    pub low_stock_threshold: i32,
    pub low_stock: Vec<LowStockProduct>,
    pub orders_count: u64,
    pub units_sold: i64,
    pub gross_sales: Decimal,
    pub generated_at: DateTime<Utc>,
}

/// Units and revenue per product over sold lines, best sellers first.
pub fn rank_products(lines: &[order_item::Model], limit: usize) -> Vec<TopProduct> {
    let mut totals: HashMap<uuid::Uuid, TopProduct> = HashMap::new();
    for line in lines {
        let entry = totals.entry(line.product_id).or_insert_with(|| TopProduct {
            product_id: line.product_id,
            name: line.product_name.clone(),
            units_sold: 0,
            revenue: Decimal::ZERO,
        });
        entry.units_sold += i64::from(line.quantity);
        entry.revenue += line.line_total();
    }

    let mut ranked: Vec<TopProduct> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.units_sold
            .cmp(&a.units_sold)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

pub fn average_order_value(revenue: Decimal, paid_orders: u64) -> Decimal {
    if paid_orders == 0 {
        return Decimal::ZERO;
    }
    (revenue / Decimal::from(paid_orders)).round_dp(2)
}

/// Aggregations for the admin and vendor dashboards
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn admin_overview(&self) -> Result<AdminOverview, ServiceError> {
        info!("Generating admin overview");

        let users_by_role = user::Entity::find()
            .select_only()
            .column(user::Column::Role)
            .column_as(Expr::col(user::Column::Id).count(), "total")
            .group_by(user::Column::Role)
            .into_tuple::<(Role, i64)>()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(role, n)| (role.as_str().to_string(), n.max(0) as u64))
            .collect();

        let vendors_by_status = vendor::Entity::find()
            .select_only()
            .column(vendor::Column::Status)
            .column_as(Expr::col(vendor::Column::Id).count(), "total")
            .group_by(vendor::Column::Status)
            .into_tuple::<(VendorStatus, i64)>()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(status, n)| (status_label(&status), n.max(0) as u64))
            .collect();

        let orders_by_status = order::Entity::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(Expr::col(order::Column::Id).count(), "total")
            .group_by(order::Column::Status)
            .into_tuple::<(OrderStatus, i64)>()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(status, n)| (status_label(&status), n.max(0) as u64))
            .collect();

        let product_count = product::Entity::find().count(&*self.db).await?;

        let completed: Vec<Decimal> = payment::Entity::find()
            .select_only()
            .column(payment::Column::Amount)
            .filter(payment::Column::Status.eq(PaymentStatus::Completed))
            .into_tuple::<Decimal>()
            .all(&*self.db)
            .await?;
        let revenue: Decimal = completed.iter().copied().sum::<Decimal>().round_dp(2);
        let average_order_value = average_order_value(revenue, completed.len() as u64);

        let sold_lines = order_item::Entity::find()
            .inner_join(order::Entity)
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .all(&*self.db)
            .await?;

        Ok(AdminOverview {
            users_by_role,
            vendors_by_status,
            product_count,
            orders_by_status,
            revenue,
            average_order_value,
            top_products: rank_products(&sold_lines, TOP_PRODUCTS),
            generated_at: Utc::now(),
        })
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn vendor_overview(&self, user: &AuthUser) -> Result<VendorOverview, ServiceError> {
        let vendor = vendor_for_user(&*self.db, user.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Vendor profile"))?;

        let product_count = product::Entity::find()
            .filter(product::Column::VendorId.eq(vendor.id))
            .count(&*self.db)
            .await?;

        let low_stock = product::Entity::find()
            .filter(product::Column::VendorId.eq(vendor.id))
            .filter(product::Column::Stock.lte(LOW_STOCK_THRESHOLD))
            .order_by_asc(product::Column::Stock)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| LowStockProduct {
                id: p.id,
                name: p.name,
                stock: p.stock,
            })
            .collect();

        let lines = order_item::Entity::find()
            .inner_join(order::Entity)
            .filter(order_item::Column::VendorId.eq(vendor.id))
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .all(&*self.db)
            .await?;

        let orders_count = lines.iter().map(|l| l.order_id).collect::<HashSet<_>>().len() as u64;
        let units_sold = lines.iter().map(|l| i64::from(l.quantity)).sum();
        let gross_sales = lines.iter().map(|l| l.line_total()).sum::<Decimal>().round_dp(2);

        Ok(VendorOverview {
            vendor_id: vendor.id,
            product_count,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            low_stock,
            orders_count,
            units_sold,
            gross_sales,
            generated_at: Utc::now(),
        })
    }
}

/// Serialized enum name, e.g. `"PENDING"`.
fn status_label<T: Serialize>(status: &T) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn line(product_id: Uuid, name: &str, quantity: i32, price: Decimal) -> order_item::Model {
        order_item::Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id,
            variant_id: None,
            vendor_id: Uuid::new_v4(),
            product_name: name.to_string(),
            variant_label: None,
            quantity,
            price,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ranking_orders_by_units_then_revenue() {
        let coffee = Uuid::new_v4();
        let basket = Uuid::new_v4();
        let tea = Uuid::new_v4();
        let lines = vec![
            line(coffee, "Coffee", 2, dec!(8000)),
            line(basket, "Basket", 3, dec!(15000)),
            line(coffee, "Coffee", 1, dec!(8000)),
            line(tea, "Tea", 3, dec!(3000)),
        ];

        let ranked = rank_products(&lines, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].product_id, basket);
        assert_eq!(ranked[0].revenue, dec!(45000));
        assert_eq!(ranked[1].product_id, coffee);
        assert_eq!(ranked[1].units_sold, 3);
    }

    #[test]
    fn average_with_no_orders_is_zero() {
        assert_eq!(average_order_value(dec!(0), 0), Decimal::ZERO);
        assert_eq!(average_order_value(dec!(100), 3), dec!(33.33));
    }

    #[test]
    fn labels_use_wire_names() {
        assert_eq!(status_label(&OrderStatus::Delivered), "DELIVERED");
        assert_eq!(status_label(&VendorStatus::Pending), "PENDING");
    }
}
