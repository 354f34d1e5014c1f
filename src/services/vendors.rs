use crate::{
    auth::AuthUser,
    entities::{product, vendor, Role, VendorStatus},
    errors::ServiceError,
    services::clean_optional,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Seller profile as seen by its owner and by admins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub status: VendorStatus,
    pub is_verified: bool,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<vendor::Model> for VendorProfile {
    fn from(model: vendor::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            business_name: model.business_name,
            description: model.description,
            address: model.address,
            phone: model.phone,
            status: model.status,
            is_verified: model.is_verified,
            reviewed_by: model.reviewed_by,
            reviewed_at: model.reviewed_at,
            review_note: model.review_note,
            created_at: model.created_at,
        }
    }
}

/// Storefront view of an approved vendor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicVendor {
    pub id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub is_verified: bool,
    pub product_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApplyVendorInput {
    #[validate(length(min = 2, max = 120, message = "must be 2-120 characters"))]
    pub business_name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateVendorInput {
    #[validate(length(min = 2, max = 120, message = "must be 2-120 characters"))]
    pub business_name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReviewVendorInput {
    pub decision: VendorStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Loads the caller's vendor profile, if any.
pub async fn vendor_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Option<vendor::Model>, ServiceError> {
    Ok(vendor::Entity::find()
        .filter(vendor::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// The caller's vendor profile, which must have been approved by an admin.
pub async fn approved_vendor_for<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<vendor::Model, ServiceError> {
    let vendor = vendor_for_user(db, user_id)
        .await?
        .ok_or_else(|| ServiceError::Forbidden("Vendor profile required".to_string()))?;
    if !vendor.is_approved() {
        warn!(vendor_id = %vendor.id, status = ?vendor.status, "vendor not approved");
        return Err(ServiceError::Forbidden(
            "Vendor account is not approved".to_string(),
        ));
    }
    Ok(vendor)
}

/// Inserts a PENDING profile. Shared by registration and `apply`.
pub(crate) async fn insert_pending_vendor<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    input: ApplyVendorInput,
) -> Result<vendor::Model, ServiceError> {
    let business_name = input.business_name.trim().to_string();
    if business_name.is_empty() {
        return Err(ServiceError::ValidationError(
            "business_name: must not be blank".to_string(),
        ));
    }
    let now = Utc::now();
    let model = vendor::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        business_name: Set(business_name),
        description: Set(clean_optional(input.description)),
        address: Set(clean_optional(input.address)),
        phone: Set(clean_optional(input.phone)),
        status: Set(VendorStatus::Pending),
        is_verified: Set(false),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        review_note: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

/// Seller onboarding and admin review
#[derive(Clone)]
pub struct VendorService {
    db: Arc<DatabaseConnection>,
}

impl VendorService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Opens a PENDING vendor profile for a VENDOR account that has none yet.
    #[instrument(skip(self, input), fields(user_id = %user.user_id))]
    pub async fn apply(
        &self,
        user: &AuthUser,
        input: ApplyVendorInput,
    ) -> Result<VendorProfile, ServiceError> {
        input.validate()?;
        if user.role != Role::Vendor {
            return Err(ServiceError::Forbidden(
                "Only vendor accounts can apply".to_string(),
            ));
        }
        if vendor_for_user(&*self.db, user.user_id).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Vendor profile already exists".to_string(),
            ));
        }

        let vendor = insert_pending_vendor(&*self.db, user.user_id, input).await?;
        info!(vendor_id = %vendor.id, "vendor application submitted");
        Ok(vendor.into())
    }

    #[instrument(skip(self))]
    pub async fn my_vendor(&self, user_id: Uuid) -> Result<VendorProfile, ServiceError> {
        vendor_for_user(&*self.db, user_id)
            .await?
            .map(VendorProfile::from)
            .ok_or_else(|| ServiceError::not_found("Vendor profile"))
    }

    #[instrument(skip(self, input))]
    pub async fn update_my_vendor(
        &self,
        user_id: Uuid,
        input: UpdateVendorInput,
    ) -> Result<VendorProfile, ServiceError> {
        input.validate()?;
        let vendor = vendor_for_user(&*self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Vendor profile"))?;

        let mut active: vendor::ActiveModel = vendor.into();
        if let Some(name) = input.business_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "business_name: must not be blank".to_string(),
                ));
            }
            active.business_name = Set(name);
        }
        if input.description.is_some() {
            active.description = Set(clean_optional(input.description));
        }
        if input.address.is_some() {
            active.address = Set(clean_optional(input.address));
        }
        if input.phone.is_some() {
            active.phone = Set(clean_optional(input.phone));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn list_vendors(
        &self,
        status: Option<VendorStatus>,
    ) -> Result<Vec<VendorProfile>, ServiceError> {
        let mut query = vendor::Entity::find().order_by_desc(vendor::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(vendor::Column::Status.eq(status));
        }
        Ok(query
            .all(&*self.db)
            .await?
            .into_iter()
            .map(VendorProfile::from)
            .collect())
    }

    /// Records an admin decision. A later review may reverse an earlier one.
    #[instrument(skip(self, input))]
    pub async fn review_vendor(
        &self,
        admin_id: Uuid,
        vendor_id: Uuid,
        input: ReviewVendorInput,
    ) -> Result<VendorProfile, ServiceError> {
        input.validate()?;
        if input.decision == VendorStatus::Pending {
            return Err(ServiceError::BadRequest(
                "Decision must be APPROVED or REJECTED".to_string(),
            ));
        }

        let vendor = vendor::Entity::find_by_id(vendor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Vendor"))?;

        let now = Utc::now();
        let mut active: vendor::ActiveModel = vendor.into();
        active.status = Set(input.decision);
        active.is_verified = Set(input.decision == VendorStatus::Approved);
        active.reviewed_by = Set(Some(admin_id));
        active.reviewed_at = Set(Some(now));
        active.review_note = Set(clean_optional(input.note));
        active.updated_at = Set(now);
        let vendor = active.update(&*self.db).await?;

        info!(vendor_id = %vendor.id, decision = ?vendor.status, "vendor reviewed");
        Ok(vendor.into())
    }

    #[instrument(skip(self))]
    pub async fn get_public_vendor(&self, vendor_id: Uuid) -> Result<PublicVendor, ServiceError> {
        let vendor = vendor::Entity::find_by_id(vendor_id)
            .one(&*self.db)
            .await?
            .filter(|v| v.is_approved())
            .ok_or_else(|| ServiceError::not_found("Vendor"))?;

        let product_count = product::Entity::find()
            .filter(product::Column::VendorId.eq(vendor.id))
            .filter(product::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;

        Ok(PublicVendor {
            id: vendor.id,
            business_name: vendor.business_name,
            description: vendor.description,
            address: vendor.address,
            is_verified: vendor.is_verified,
            product_count,
        })
    }
}
