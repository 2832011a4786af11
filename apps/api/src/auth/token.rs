use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::Role;

pub const SESSION_COOKIE: &str = "token";
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    /// Token id, used to revoke a single session on logout.
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Seconds until the token expires; zero once it has.
    pub fn remaining_secs(&self, now: i64) -> u64 {
        u64::try_from(self.exp - now).unwrap_or(0)
    }
}

/// HS256 signing keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<(String, Claims), AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))?;
        Ok((token, claims))
    }

    /// No leeway: a token past `exp` is rejected at once, so the revocation
    /// entry written on logout never outlives the token it blocks.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Not authorized, token failed".to_string()))
    }
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

pub fn cleared_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_verify() {
        let keys = TokenKeys::new("test-secret");
        let user = Uuid::new_v4();
        let (token, claims) = keys.issue(user, Role::Manager).unwrap();
        let verified = keys.verify(&token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.sub, user);
        assert_eq!(verified.exp - verified.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let (token, _) = TokenKeys::new("a").issue(Uuid::new_v4(), Role::Admin).unwrap();
        let err = TokenKeys::new("b").verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = TokenKeys::new("test-secret");
        let past = Utc::now().timestamp() - 2 * 3600;
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Intern,
            jti: Uuid::new_v4(),
            iat: past - 3600,
            exp: past,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_just_expired_token_rejected() {
        let keys = TokenKeys::new("test-secret");
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Intern,
            jti: Uuid::new_v4(),
            iat: now - 3600,
            exp: now - 30,
        };
        assert_eq!(claims.remaining_secs(now), 0);
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_remaining_secs() {
        let claims = Claims {
            sub: Uuid::nil(),
            role: Role::Admin,
            jti: Uuid::nil(),
            iat: 0,
            exp: 100,
        };
        assert_eq!(claims.remaining_secs(40), 60);
        assert_eq!(claims.remaining_secs(500), 0);
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("abc".into(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }
}
