use std::sync::Arc;

use anyhow::{Context, Result};
use ledger_api::{
    config::{Config, StoreKind},
    db::Database,
    ledger::{
        controller::LedgerController, memory::InMemoryAccountStore, repository::AccountRepository,
        repository::AccountStore,
    },
    server::Server,
};
use tokio::sync::oneshot;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn AccountStore> = match (config.store, config.database_url.as_deref()) {
        (StoreKind::Sql, Some(url)) => {
            let pool = Database::new_pool(url, &config)
                .await
                .context("Failed to create DB pool")?;
            let repository = AccountRepository::new(pool);
            repository.print_pool_stats();
            Arc::new(repository)
        }
        (StoreKind::Sql, None) => anyhow::bail!("DATABASE_URL must be set"),
        (StoreKind::Memory, _) => {
            warn!("using the in-memory account store, balances are not persisted");
            let store = InMemoryAccountStore::new();
            for (user_id, balance) in &config.seed {
                store.insert(*user_id, *balance)?;
            }
            Arc::new(store)
        }
    };

    let controller = Arc::new(LedgerController::new(store));
    let server = Server::new(config.server_addr.clone(), controller);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = shutdown_tx.send(());
        }
    });

    server.start(shutdown_rx).await
}
