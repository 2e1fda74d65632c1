use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::env;
use std::time::Duration;

/// Connects using `DATABASE_URL`. Pool bounds come from `DB_MAX_CONNECTIONS`
/// and `DB_MIN_CONNECTIONS`.
pub async fn get_database() -> Result<DatabaseConnection, DbErr> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| DbErr::Custom("DATABASE_URL must be set".to_string()))?;

    let max_connections = env_u32("DB_MAX_CONNECTIONS", 10);
    let min_connections = env_u32("DB_MIN_CONNECTIONS", 2).min(max_connections);

    connect(&database_url, max_connections, min_connections).await
}

pub async fn connect(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_string());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    // An in-memory SQLite database lives and dies with its single connection.
    if !database_url.contains(":memory:") {
        opt.idle_timeout(Duration::from_secs(300));
    }

    Database::connect(opt).await
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
