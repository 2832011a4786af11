use std::sync::LazyLock;

use regex::Regex;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::config::SeedAdmin;
use crate::errors::AppError;
use crate::models::user::{Role, UserRow};

static EMAIL_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email format pattern"));

/// Trims and lower-cases an email, rejecting anything not shaped like one.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_FORMAT.is_match(&email) {
        return Err(AppError::Validation(
            "Please provide a valid email address".to_string(),
        ));
    }
    Ok(email)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<UserRow, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("User already exists".to_string())
        }
        _ => AppError::Database(e),
    })?;
    Ok(user)
}

/// Returns false when no user has that id.
pub async fn set_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Creates the bootstrap admin if no account with that email exists yet.
pub async fn ensure_seed_admin(pool: &PgPool, seed: &SeedAdmin) -> anyhow::Result<()> {
    let email = normalize_email(&seed.email)?;
    if find_by_email(pool, &email).await?.is_some() {
        info!("Seed admin {email} already exists");
        return Ok(());
    }
    let hash = hash_password(seed.password.clone()).await?;
    create_user(pool, &email, &hash, Role::Admin).await?;
    info!("Seed admin {email} created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM ").unwrap(),
            "jane.doe@example.com"
        );
        assert!(normalize_email("jane@localhost").is_err());
        assert!(normalize_email("jane doe@example.com").is_err());
        assert!(normalize_email("").is_err());
    }
}
