//! Authentication handlers.

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use blog_core::ports::{PasswordService, TokenService};
use blog_shared::dto::{AuthResponse, LoginRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::observability::RequestId;
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    request_id: RequestId,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let Some(user) = state.users.find_by_email(req.email.trim()).await? else {
        tracing::info!(request_id = request_id.as_str(), "Login rejected: unknown account");
        return Err(AppError::Unauthorized);
    };

    let valid = password_service
        .verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        tracing::info!(
            request_id = request_id.as_str(),
            user_id = %user.id,
            "Login rejected: wrong password"
        );
        return Err(AppError::Unauthorized);
    }

    let token = token_service
        .generate_token(&user)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Ok().json(AuthResponse::bearer(
        token,
        token_service.expiration_seconds().max(0) as u64,
    )))
}

/// GET /api/auth/me - Protected route
pub async fn me(identity: Identity) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(UserResponse {
        id: identity.user_id,
        email: identity.email,
        roles: identity.roles,
    }))
}
