use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::{Expense, ExpenseId};

use super::{MIGRATIONS, MIGRATION_000_SCHEMA_MIGRATIONS};

const EXPENSE_COLUMNS: &str = "id, title, amount, note, tags";

/// Repository for persisting and querying expenses.
///
/// Every method is a single statement against the pool, so each call either
/// fully applies or fails without side effects.
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the SQLite database at the given URL.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Apply every migration that has not been recorded yet.
    /// Returns how many were applied on this call.
    pub async fn migrate(&self) -> Result<usize> {
        sqlx::query(MIGRATION_000_SCHEMA_MIGRATIONS)
            .execute(&self.pool)
            .await
            .context("Failed to create schema_migrations table")?;

        let applied: HashSet<i64> = sqlx::query("SELECT version FROM schema_migrations")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read applied migrations")?
            .iter()
            .map(|row| row.get::<i64, _>("version"))
            .collect();

        let mut count = 0;
        for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
            let mut tx = self.pool.begin().await?;
            sqlx::query(migration.sql)
                .execute(&mut *tx)
                .await
                .with_context(|| {
                    format!(
                        "Failed to run migration {:03} ({})",
                        migration.version, migration.name
                    )
                })?;
            sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
                .bind(migration.version)
                .bind(migration.name)
                .bind(Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await
                .context("Failed to record migration")?;
            tx.commit().await?;
            count += 1;
        }

        Ok(count)
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Insert a new expense and return the stored row.
    /// The id of `expense` is ignored; the database assigns one.
    pub async fn insert_expense(&self, expense: &Expense) -> Result<Expense> {
        let tags_json = serde_json::to_string(&expense.tags)?;

        let row = sqlx::query(&format!(
            "INSERT INTO expenses (title, amount, note, tags) VALUES (?, ?, ?, ?) RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(&expense.title)
        .bind(expense.amount)
        .bind(&expense.note)
        .bind(&tags_json)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert expense")?;

        Self::row_to_expense(&row)
    }

    /// Get an expense by ID.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch expense {id}"))?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// List all expenses, ordered by ID.
    pub async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    /// Overwrite the row addressed by `expense.id`.
    /// Returns `None` when no such row exists.
    pub async fn update_expense(&self, expense: &Expense) -> Result<Option<Expense>> {
        let tags_json = serde_json::to_string(&expense.tags)?;

        let row = sqlx::query(&format!(
            "UPDATE expenses SET title = ?, amount = ?, note = ?, tags = ? WHERE id = ? RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(&expense.title)
        .bind(expense.amount)
        .bind(&expense.note)
        .bind(&tags_json)
        .bind(expense.id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update expense {}", expense.id))?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_expense(row: &SqliteRow) -> Result<Expense> {
        let id: ExpenseId = row.get("id");
        let tags_str: String = row.get("tags");

        Ok(Expense {
            id,
            title: row.get("title"),
            amount: row.get("amount"),
            note: row.get("note"),
            tags: serde_json::from_str(&tags_str)
                .with_context(|| format!("Invalid tags for expense {id}"))?,
        })
    }
}
