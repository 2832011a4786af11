use rand::distr::Alphanumeric;
use rand::Rng;

use crate::errors::AppError;

const BCRYPT_COST: u32 = 10;
pub const MIN_PASSWORD_LEN: usize = 6;
const TEMP_PASSWORD_LEN: usize = 10;

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

// bcrypt is deliberately slow; keep it off the async workers.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {e}")))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {e}")))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to verify password: {e}")))
}

/// Random alphanumeric password handed to new interns by email.
pub fn temporary_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_temporary_password_shape() {
        let a = temporary_password();
        let b = temporary_password();
        assert_eq!(a.len(), TEMP_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("s3cret!".into()).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("s3cret!".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
    }
}
