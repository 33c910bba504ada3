//! Pool construction and migration bootstrap.

use scheduler_core::Result;
use sqlx::any::{AnyPoolOptions, AnyKind};
use sqlx::AnyPool;
use tracing::info;

use crate::config::StoreConfig;

/// Open a connection pool against the configured backend and run the
/// embedded migrations. `sqlx::Any` lets `scheduler-store` speak both
/// SQLite (the default, zero-setup backend used in tests and dev) and
/// Postgres (the documented production target) through one query path.
pub async fn connect(config: &StoreConfig) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();

    info!(url = %redact(&config.url), "opening task store pool");

    let pool = AnyPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    if pool.any_kind() == AnyKind::Sqlite {
        sqlx::query("PRAGMA foreign_keys = ON;").execute(&pool).await?;
    }

    if config.run_migrations {
        crate::migrate(&pool).await?;
    }

    Ok(pool)
}

fn redact(url: &str) -> String {
    match url.find('@') {
        Some(at) => format!("***{}", &url[at..]),
        None => url.to_string(),
    }
}
