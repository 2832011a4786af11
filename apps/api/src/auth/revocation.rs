//! Logged-out token ids, kept in Redis until the token would have expired.

use redis::aio::MultiplexedConnection;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

fn revoked_key(jti: Uuid) -> String {
    format!("talentdesk:revoked:{jti}")
}

pub async fn revoke(
    redis: &MultiplexedConnection,
    jti: Uuid,
    ttl_secs: u64,
) -> Result<(), AppError> {
    if ttl_secs == 0 {
        return Ok(());
    }
    let mut conn = redis.clone();
    redis::cmd("SET")
        .arg(revoked_key(jti))
        .arg(1)
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(&mut conn)
        .await?;
    debug!("Revoked token {jti} for {ttl_secs}s");
    Ok(())
}

pub async fn is_revoked(redis: &MultiplexedConnection, jti: Uuid) -> Result<bool, AppError> {
    let mut conn = redis.clone();
    let exists = redis::cmd("EXISTS")
        .arg(revoked_key(jti))
        .query_async::<_, bool>(&mut conn)
        .await?;
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoked_key_is_namespaced() {
        let jti = Uuid::nil();
        assert_eq!(
            revoked_key(jti),
            "talentdesk:revoked:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_shared_connection_fits_app_state() {
        fn shareable<T: Clone + Send + Sync + 'static>() {}
        shareable::<MultiplexedConnection>();
    }
}
