//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod reconcile;
mod repository;

pub use reconcile::*;
pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create tables if they don't exist
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS currencies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_email TEXT NOT NULL,
            name TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_email TEXT NOT NULL,
            name TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transaction_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            split_type TEXT NOT NULL,
            original_currency TEXT NOT NULL DEFAULT '',
            currency_id INTEGER,
            category_id INTEGER,
            hidden INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transaction_group_members (
            transaction_group_id INTEGER NOT NULL
                REFERENCES transaction_groups(id) ON DELETE CASCADE,
            user_email TEXT NOT NULL,
            user_name TEXT NOT NULL DEFAULT '',
            split_value INTEGER,
            joined INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (transaction_group_id, user_email)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_email TEXT NOT NULL,
            amount INTEGER NOT NULL,
            currency_id INTEGER NOT NULL,
            sender_account_id INTEGER,
            receiver_account_id INTEGER,
            category_id INTEGER,
            date TEXT NOT NULL,
            note TEXT NOT NULL DEFAULT '',
            receiver_currency_id INTEGER NOT NULL,
            receiver_amount INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS financial_income (
            transaction_id INTEGER PRIMARY KEY
                REFERENCES transactions(id) ON DELETE CASCADE,
            related_currency_id INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grouped_transactions (
            transaction_id INTEGER PRIMARY KEY
                REFERENCES transactions(id) ON DELETE CASCADE,
            transaction_group_id INTEGER NOT NULL
                REFERENCES transaction_groups(id) ON DELETE CASCADE,
            split_type_override TEXT,
            triggered_by_owner INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grouped_transaction_member_values (
            transaction_id INTEGER NOT NULL
                REFERENCES transactions(id) ON DELETE CASCADE,
            user_email TEXT NOT NULL,
            split_value INTEGER,
            PRIMARY KEY (transaction_id, user_email)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_currencies_owner ON currencies(owner_email);
        CREATE INDEX IF NOT EXISTS idx_categories_owner ON categories(owner_email);
        CREATE INDEX IF NOT EXISTS idx_group_members_email ON transaction_group_members(user_email);
        CREATE INDEX IF NOT EXISTS idx_transactions_owner ON transactions(owner_email);
        CREATE INDEX IF NOT EXISTS idx_grouped_transactions_group ON grouped_transactions(transaction_group_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
