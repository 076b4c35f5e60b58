mod ledger_repository;

pub use ledger_repository::PostgresLedgerRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

pub async fn create_pool(config: &PostgresConfig) -> sqlx::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string)
        .await
}
