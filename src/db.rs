use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;
const REQUIRED_TABLES: [&str; 2] = ["partner_detail", "funding_config"];

/// Pool for the funding-config store.
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Connects and checks that the funding-config tables exist.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to funding-config store: {}", e))?;

        for table in REQUIRED_TABLES {
            let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
                .bind(table)
                .fetch_one(&pool)
                .await?;
            if !exists {
                anyhow::bail!(
                    "Table '{}' is missing; apply migrations/0001_funding_config.sql",
                    table
                );
            }
        }

        Ok(Self { pool })
    }
}
