use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::notification::NotificationTarget;

/// Geo-radius lookup of profiles around a point. The spatial work happens in the store.
#[async_trait::async_trait]
pub trait ProximityDirectory: Send + Sync {
    async fn users_in_radius(&self, lat: f64, lng: f64, radius_meters: u32) -> Result<Vec<NotificationTarget>, AppError>;
}

#[async_trait::async_trait]
impl ProximityDirectory for PostgresRepository {
    async fn users_in_radius(&self, lat: f64, lng: f64, radius_meters: u32) -> Result<Vec<NotificationTarget>, AppError> {
        let radius = i32::try_from(radius_meters)
            .map_err(|_| AppError::Configuration(format!("Raio de notificação inválido: {} metros", radius_meters)))?;

        let targets = sqlx::query_as::<_, NotificationTarget>(
            r#"
            SELECT id, email, full_name
            FROM get_users_in_radius(p_lng => $1, p_lat => $2, p_radius => $3)
            "#,
        )
        .bind(lng)
        .bind(lat)
        .bind(radius)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::db("Failed to look up users in radius", e))?;

        Ok(targets)
    }
}
