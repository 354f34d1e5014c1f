use super::common::{AppJson, MessageResponse};
use crate::{
    auth::AuthUser,
    errors::{ErrorResponse, ServiceError},
    handlers::AppState,
    services::users::{
        AuthResponse, ChangePasswordInput, LoginInput, RegisterInput, UpdateProfileInput,
        UserResponse,
    },
};
use axum::{extract::State, http::StatusCode, Json};

/// Register a customer or vendor account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterInput>,
) -> Result<(StatusCode, Json<AuthResponse>), ServiceError> {
    let response = state.services.users.register(input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account deactivated", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginInput>,
) -> Result<Json<AuthResponse>, ServiceError> {
    Ok(Json(state.services.users.login(input).await?))
}

/// Current user, with the vendor profile for vendor accounts
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(state.services.users.me(user.user_id).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<UpdateProfileInput>,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(
        state.services.users.update_profile(user.user_id, input).await?,
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<ChangePasswordInput>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state
        .services
        .users
        .change_password(user.user_id, input)
        .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// Revokes the bearer token used for this request
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.users.logout(&user).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}
