// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use expenses::{Expense, ExpenseService};
use tempfile::TempDir;

/// SQLite URL for a database file inside `temp_dir`
pub fn database_url(temp_dir: &TempDir) -> String {
    let db_path = temp_dir.path().join("test.db");
    format!("sqlite:{}?mode=rwc", db_path.display())
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(ExpenseService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = ExpenseService::init(&database_url(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Test fixture: the dinner expense used throughout the suite
pub fn dinner() -> Expense {
    Expense::new("food", 100.0)
        .with_note("dinner")
        .with_tags(["food", "dinner"])
}
