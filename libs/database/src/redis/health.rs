use redis::aio::ConnectionManager;
use tracing::debug;

use crate::common::DatabaseError;

/// `PING` must answer `PONG`
pub async fn check_health(conn: &ConnectionManager) -> Result<(), DatabaseError> {
    let mut conn = conn.clone();
    let response: String = redis::cmd("PING").query_async(&mut conn).await?;

    if response != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "Redis PING returned unexpected response: {}",
            response
        )));
    }

    debug!("Redis health check passed");
    Ok(())
}
