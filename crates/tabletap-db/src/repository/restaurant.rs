//! # Restaurant Repository
//!
//! Settings rows the engine consumes: QR token policy, service charge rate,
//! POS webhook target.

use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tabletap_core::Restaurant;

/// Inserts a restaurant row.
pub async fn insert(exec: impl SqliteExecutor<'_>, restaurant: &Restaurant) -> DbResult<()> {
    debug!(id = %restaurant.id, name = %restaurant.name, "Inserting restaurant");

    sqlx::query(
        r#"
        INSERT INTO restaurants (
            id, name, regenerate_qr_per_session, service_charge_bps,
            pos_endpoint, pos_credential, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&restaurant.id)
    .bind(&restaurant.name)
    .bind(restaurant.regenerate_qr_per_session)
    .bind(restaurant.service_charge_bps)
    .bind(&restaurant.pos_endpoint)
    .bind(&restaurant.pos_credential)
    .bind(restaurant.created_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Gets a restaurant by ID.
pub async fn get(exec: impl SqliteExecutor<'_>, id: &str) -> DbResult<Option<Restaurant>> {
    let restaurant = sqlx::query_as::<_, Restaurant>(
        r#"
        SELECT id, name, regenerate_qr_per_session, service_charge_bps,
               pos_endpoint, pos_credential, created_at
        FROM restaurants
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(restaurant)
}

/// Gets a restaurant by ID, failing when absent.
pub async fn get_required(exec: impl SqliteExecutor<'_>, id: &str) -> DbResult<Restaurant> {
    get(exec, id)
        .await?
        .ok_or_else(|| DbError::not_found("Restaurant", id))
}

/// Updates the service charge rate (staff settings change).
pub async fn set_service_charge_bps(
    exec: impl SqliteExecutor<'_>,
    id: &str,
    service_charge_bps: i64,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE restaurants SET service_charge_bps = ?2 WHERE id = ?1")
        .bind(id)
        .bind(service_charge_bps)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Restaurant", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn restaurant(id: &str) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: "Noodle Bar".to_string(),
            regenerate_qr_per_session: true,
            service_charge_bps: 1000,
            pos_endpoint: Some("https://pos.example/hook".to_string()),
            pos_credential: Some("secret".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        insert(db.pool(), &restaurant("rest-1")).await.unwrap();

        let loaded = get(db.pool(), "rest-1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Noodle Bar");
        assert!(loaded.regenerate_qr_per_session);
        assert_eq!(loaded.service_charge_bps, 1000);
        assert_eq!(loaded.pos_endpoint.as_deref(), Some("https://pos.example/hook"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(get(db.pool(), "nope").await.unwrap().is_none());

        let err = get_required(db.pool(), "nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_service_charge() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(db.pool(), &restaurant("rest-1")).await.unwrap();

        set_service_charge_bps(db.pool(), "rest-1", 1250).await.unwrap();
        let loaded = get(db.pool(), "rest-1").await.unwrap().unwrap();
        assert_eq!(loaded.service_charge_bps, 1250);
    }
}
