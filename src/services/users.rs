use crate::{
    auth::{hash_password, verify_password, AccessToken, AuthService, AuthUser, MIN_PASSWORD_LEN},
    entities::{user, Role},
    errors::ServiceError,
    services::{
        clean_optional, normalize_email,
        vendors::{insert_pending_vendor, vendor_for_user, ApplyVendorInput, VendorProfile},
        Page,
    },
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    /// CUSTOMER (default) or VENDOR
    pub role: Option<Role>,
    /// Required when registering as a vendor
    #[validate(length(min = 2, max = 120, message = "must be 2-120 characters"))]
    pub business_name: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordInput {
    pub current_password: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub new_password: String,
}

/// Account details returned to the owner and to admins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorProfile>,
}

impl UserResponse {
    fn new(model: user::Model, vendor: Option<VendorProfile>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            is_active: model.is_active,
            email_verified: model.email_verified,
            phone: model.phone,
            created_at: model.created_at,
            vendor,
        }
    }
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self::new(model, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

impl AuthResponse {
    fn new(token: AccessToken, user: UserResponse) -> Self {
        Self {
            token: token.token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user,
        }
    }
}

/// Registration, login and account management
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Creates a CUSTOMER or VENDOR account. Vendors get a PENDING profile in the same transaction.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, mut input: RegisterInput) -> Result<AuthResponse, ServiceError> {
        input.email = normalize_email(&input.email);
        input.name = input.name.trim().to_string();
        input.validate()?;

        let role = input.role.unwrap_or(Role::Customer);
        if role == Role::Admin {
            return Err(ServiceError::BadRequest(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }
        if input.name.is_empty() {
            return Err(ServiceError::ValidationError(
                "name: must not be blank".to_string(),
            ));
        }
        let vendor_input = match role {
            Role::Vendor => {
                let business_name = clean_optional(input.business_name.clone()).ok_or_else(|| {
                    ServiceError::ValidationError(
                        "business_name: is required for vendor accounts".to_string(),
                    )
                })?;
                Some(ApplyVendorInput {
                    business_name,
                    description: None,
                    address: input.address.clone(),
                    phone: input.phone.clone(),
                })
            }
            _ => None,
        };

        if self.find_by_email(&input.email).await?.is_some() {
            counter!("iwanyu_auth.registrations", 1, "outcome" => "duplicate");
            return Err(ServiceError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            password_hash: Set(password_hash),
            role: Set(role),
            is_active: Set(true),
            email_verified: Set(false),
            phone: Set(clean_optional(input.phone)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match ServiceError::from(e) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict("Email is already registered".to_string())
            }
            other => other,
        })?;

        let vendor = match vendor_input {
            Some(vendor_input) => Some(insert_pending_vendor(&txn, user.id, vendor_input).await?),
            None => None,
        };
        txn.commit().await?;

        counter!("iwanyu_auth.registrations", 1, "outcome" => "success", "role" => role.as_str());
        info!(user_id = %user.id, role = %role, "user registered");

        let token = self.auth.issue_token(&user)?;
        Ok(AuthResponse::new(
            token,
            UserResponse::new(user, vendor.map(VendorProfile::from)),
        ))
    }

    /// Unknown email and wrong password share one error message.
    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, ServiceError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let Some(user) = self.find_by_email(&email).await? else {
            counter!("iwanyu_auth.logins", 1, "outcome" => "failure");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&input.password, &user.password_hash)? {
            counter!("iwanyu_auth.logins", 1, "outcome" => "failure");
            warn!(user_id = %user.id, "failed login attempt");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            counter!("iwanyu_auth.logins", 1, "outcome" => "inactive");
            return Err(ServiceError::Forbidden("Account is deactivated".to_string()));
        }

        counter!("iwanyu_auth.logins", 1, "outcome" => "success");
        info!(user_id = %user.id, "user logged in");

        let token = self.auth.issue_token(&user)?;
        let response = self.with_vendor(user).await?;
        Ok(AuthResponse::new(token, response))
    }

    #[instrument(skip(self))]
    pub async fn me(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let user = self.get_user(user_id).await?;
        self.with_vendor(user).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<UserResponse, ServiceError> {
        input.validate()?;
        let user = self.get_user(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "name: must not be blank".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if input.phone.is_some() {
            active.phone = Set(clean_optional(input.phone));
        }
        active.updated_at = Set(Utc::now());

        let user = active.update(&*self.db).await?;
        self.with_vendor(user).await
    }

    #[instrument(skip(self, input))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: ChangePasswordInput,
    ) -> Result<(), ServiceError> {
        input.validate()?;
        let user = self.get_user(user_id).await?;
        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
        if input.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::ValidationError(
                "new_password: must be at least 6 characters".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(%user_id, "password changed");
        Ok(())
    }

    /// Revokes the token the caller authenticated with.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn logout(&self, user: &AuthUser) -> Result<(), ServiceError> {
        self.auth.revoke(&user.token_id, user.expires_at).await;
        info!("user logged out");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        role: Option<Role>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<UserResponse>, ServiceError> {
        let mut query = user::Entity::find().order_by_desc(user::Column::CreatedAt);
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page {
            items: users.into_iter().map(UserResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn set_user_active(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<UserResponse, ServiceError> {
        if admin_id == user_id && !is_active {
            return Err(ServiceError::BadRequest(
                "Admins cannot deactivate their own account".to_string(),
            ));
        }
        let user = self.get_user(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        let user = active.update(&*self.db).await?;

        if is_active {
            self.auth.unblock_user(user_id).await;
        } else {
            self.auth.block_user(user_id).await;
        }
        info!(%user_id, is_active, "user activation changed");
        self.with_vendor(user).await
    }

    #[instrument(skip(self))]
    pub async fn verify_email(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let user = self.get_user(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.email_verified = Set(true);
        active.updated_at = Set(Utc::now());
        let user = active.update(&*self.db).await?;
        self.with_vendor(user).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?)
    }

    async fn with_vendor(&self, user: user::Model) -> Result<UserResponse, ServiceError> {
        let vendor = match user.role {
            Role::Vendor => vendor_for_user(&*self.db, user.id)
                .await?
                .map(VendorProfile::from),
            _ => None,
        };
        Ok(UserResponse::new(user, vendor))
    }
}
