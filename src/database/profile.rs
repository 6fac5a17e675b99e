use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::profile::Profile;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, AppError>;
}

#[async_trait::async_trait]
impl ProfileDirectory for PostgresRepository {
    async fn get_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, full_name
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
