use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::auth::token::{cleared_cookie, session_cookie};
use crate::auth::{revocation, users};
use crate::errors::AppError;
use crate::models::user::{Role, UserView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserView,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let email = users::normalize_email(&req.email)?;
    validate_password(&req.password)?;

    let role = req.role.unwrap_or(Role::Manager);
    if !role.is_staff() {
        return Err(AppError::Validation(
            "Role must be either admin or manager".to_string(),
        ));
    }

    if users::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let hash = hash_password(req.password).await?;
    let user = users::create_user(&state.db, &email, &hash, role).await?;
    info!("Registered {} user {}", role, user.email);

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: UserView::try_from(&user)?,
        }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let email = req.email.trim().to_lowercase();
    let user = users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(req.password, user.password_hash.clone()).await? {
        warn!("Failed login for {email}");
        return Err(invalid());
    }

    let view = UserView::try_from(&user)?;
    let (token, _) = state.tokens.issue(user.id, view.role)?;
    info!("User {} logged in", user.email);

    Ok((
        jar.add(session_cookie(token, state.config.production)),
        Json(SessionResponse { user: view }),
    ))
}

/// GET /api/auth/me
pub async fn handle_me(user: AuthUser) -> Json<UserView> {
    Json(UserView {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}

/// POST /api/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let ttl = user.claims.remaining_secs(Utc::now().timestamp());
    revocation::revoke(&state.redis, user.claims.jti, ttl).await?;
    info!("User {} logged out", user.email);

    Ok((
        jar.remove(cleared_cookie()),
        Json(json!({ "message": "Logged out successfully" })),
    ))
}

/// PATCH /api/auth/users/:id/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(&[Role::Admin])?;
    validate_password(&req.password)?;

    let hash = hash_password(req.password).await?;
    if !users::set_password(&state.db, id, &hash).await? {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }
    info!("Admin {} reset password for user {id}", user.email);

    Ok(Json(json!({ "message": "Password updated successfully" })))
}
