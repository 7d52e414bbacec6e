use sqlx::AnyPool;
use tracing::info;

use crate::{config::Config, error::CustomError};

const USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
        balance BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0)
    )
"#;

pub struct Database;

impl Database {
    pub async fn new_pool(url: &str, config: &Config) -> Result<AnyPool, CustomError> {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(std::time::Duration::from_secs(30))
            .connect(url)
            .await?;
        info!(
            max = config.max_connections,
            min = config.min_connections,
            "database pool created"
        );
        Ok(pool)
    }

    /// Creates the `users` table when it does not exist yet. Balances are
    /// stored in cents.
    pub async fn ensure_schema(pool: &AnyPool) -> Result<(), CustomError> {
        sqlx::query(USERS_TABLE).execute(pool).await?;
        Ok(())
    }
}
