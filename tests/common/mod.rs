use ledger_api::db::Database;
use rand::Rng;
use sqlx::{AnyPool, any::install_default_drivers};

pub async fn setup_test_db() -> AnyPool {
    install_default_drivers();
    let timestamp: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    let db_name = format!("test_{}", timestamp);
    let database_url = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    // Create the pool (which will internally use shared memory DB)
    let pool = AnyPool::connect(&database_url)
        .await
        .expect("Failed to create in-memory SQLite DB");

    Database::ensure_schema(&pool)
        .await
        .expect("Failed to create test table");

    pool
}

/// Accounts are provisioned outside the ledger, so tests insert rows directly.
pub async fn seed_account(pool: &AnyPool, id: i64, cents: i64) {
    sqlx::query("INSERT INTO users (id, balance) VALUES ($1, $2)")
        .bind(id)
        .bind(cents)
        .execute(pool)
        .await
        .expect("Failed to insert test user");
}

pub async fn stored_cents(pool: &AnyPool, id: i64) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT balance FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance");
    row.0
}
