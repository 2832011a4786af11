use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::auth::token::{Claims, SESSION_COOKIE};
use crate::auth::{revocation, users};
use crate::errors::AppError;
use crate::models::user::Role;
use crate::state::AppState;

/// The authenticated caller, resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub claims: Claims,
}

impl AuthUser {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                self.role
            )))
        }
    }

    /// Managers and admins.
    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin, Role::Manager])
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

        let claims = state.tokens.verify(&token)?;
        if revocation::is_revoked(&state.redis, claims.jti).await? {
            return Err(AppError::Unauthorized("Session has been logged out".to_string()));
        }

        let user = users::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

        Ok(AuthUser {
            id: user.id,
            role: user.role()?,
            email: user.email,
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "x@example.com".into(),
            role,
            claims: Claims {
                sub: Uuid::nil(),
                role,
                jti: Uuid::nil(),
                iat: 0,
                exp: 0,
            },
        }
    }

    #[test]
    fn test_staff_guard() {
        assert!(user(Role::Admin).require_staff().is_ok());
        assert!(user(Role::Manager).require_staff().is_ok());
        let err = user(Role::Intern).require_staff().unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_admin_only_guard() {
        assert!(user(Role::Manager).require_role(&[Role::Admin]).is_err());
        assert!(user(Role::Admin).require_role(&[Role::Admin]).is_ok());
    }
}
