use crate::{
    auth::AuthUser,
    entities::{order, payment, OrderStatus, PaymentStatus},
    errors::ServiceError,
    services::{clean_optional, orders::restock_order},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentInput {
    pub amount: Decimal,
    /// Defaults to the order currency
    #[validate(length(equal = 3, message = "must be a 3-letter currency code"))]
    pub currency: Option<String>,
    /// e.g. MTN_MOMO, AIRTEL_MONEY, CARD
    #[validate(length(min = 2, max = 40, message = "must be 2-40 characters"))]
    pub provider: String,
    /// Generated when omitted
    #[validate(length(min = 1, max = 100))]
    pub transaction_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub provider: String,
    pub transaction_ref: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            user_id: model.user_id,
            amount: model.amount,
            currency: model.currency,
            provider: model.provider,
            transaction_ref: model.transaction_ref,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn generate_transaction_ref() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TX-{}", &id[..12])
}

/// Amounts are compared at two decimal places.
pub fn amount_matches(amount: Decimal, total: Decimal) -> bool {
    amount.round_dp(2) == total.round_dp(2)
}

#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records the buyer's payment for a PENDING order and marks it PAID.
    #[instrument(skip(self, user, input), fields(user_id = %user.user_id, provider = %input.provider))]
    pub async fn record_payment(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        input: RecordPaymentInput,
    ) -> Result<PaymentResponse, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        if order.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "You can only pay for your own orders".to_string(),
            ));
        }

        let existing = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Order already has a payment".to_string(),
            ));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(
                "Only pending orders can be paid".to_string(),
            ));
        }
        if !amount_matches(input.amount, order.total) {
            warn!(%order_id, amount = %input.amount, total = %order.total, "payment amount mismatch");
            return Err(ServiceError::BadRequest(format!(
                "Payment amount {} does not match order total {}",
                input.amount,
                order.total.round_dp(2)
            )));
        }
        let currency = input
            .currency
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_else(|| order.currency.clone());
        if currency != order.currency {
            return Err(ServiceError::BadRequest(format!(
                "Payment currency {} does not match order currency {}",
                currency, order.currency
            )));
        }

        let now = Utc::now();
        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            user_id: Set(user.user_id),
            amount: Set(order.total),
            currency: Set(currency),
            provider: Set(input.provider.trim().to_uppercase()),
            transaction_ref: Set(
                clean_optional(input.transaction_ref).unwrap_or_else(generate_transaction_ref),
            ),
            status: Set(PaymentStatus::Completed),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match ServiceError::from(e) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict("Order already has a payment".to_string())
            }
            other => other,
        })?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Paid);
        active.paid_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&txn).await?;
        txn.commit().await?;

        counter!("iwanyu_payments.recorded", 1, "provider" => payment.provider.clone());
        info!(payment_id = %payment.id, %order_id, amount = %payment.amount, "payment recorded");
        Ok(payment.into())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn get_payment(&self, user: &AuthUser, order_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        if order.user_id != user.user_id && !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "You do not have access to this order".to_string(),
            ));
        }

        payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .one(&*self.db)
            .await?
            .map(PaymentResponse::from)
            .ok_or_else(|| ServiceError::not_found("Payment"))
    }

    /// Refunds a COMPLETED payment, cancelling the order and restoring stock
    /// unless the order was already cancelled.
    #[instrument(skip(self))]
    pub async fn refund_payment(&self, order_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        let payment = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment"))?;

        if payment.status != PaymentStatus::Completed {
            return Err(ServiceError::InvalidOperation(
                "Only completed payments can be refunded".to_string(),
            ));
        }
        if order.status == OrderStatus::Delivered {
            return Err(ServiceError::InvalidOperation(
                "Delivered orders cannot be refunded".to_string(),
            ));
        }

        let now = Utc::now();
        if order.status != OrderStatus::Cancelled {
            restock_order(&txn, order.id).await?;
            let mut active: order::ActiveModel = order.into();
            active.status = Set(OrderStatus::Cancelled);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        let mut active: payment::ActiveModel = payment.into();
        active.status = Set(PaymentStatus::Refunded);
        active.updated_at = Set(now);
        let payment = active.update(&txn).await?;
        txn.commit().await?;

        counter!("iwanyu_payments.refunded", 1);
        info!(payment_id = %payment.id, %order_id, "payment refunded");
        Ok(payment.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amounts_compare_at_cents() {
        assert!(amount_matches(dec!(23299.97), dec!(23299.9700)));
        assert!(!amount_matches(dec!(23299.96), dec!(23299.97)));
    }

    #[test]
    fn generated_reference_shape() {
        let reference = generate_transaction_ref();
        assert!(reference.starts_with("TX-"));
        assert_eq!(reference.len(), 15);
        assert!(reference[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
