//! SQLite pool setup and schema management.

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr};

const INIT_SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Open a pool for `database_url`, creating the database file and its
/// parent directory when missing.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting using raw URL => {}", database_url);

    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if db_path != ":memory:" {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {:?}", parent))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parsing database URL `{}`", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", database_url))?;
    Ok(pool)
}

/// Apply the embedded schema. Every statement is idempotent.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = INIT_SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::debug!("Running {} migration statements...", statements.len());

    for stmt in statements {
        sqlx::query(stmt)
            .execute(db)
            .await
            .with_context(|| format!("executing migration SQL: {}", stmt))?;
    }

    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
