use sqlx::PgPool;

/// Repository over the privileged database pool. Handlers never see the pool itself.
#[derive(Clone)]
pub struct PostgresRepository {
    pub pool: PgPool,
}
