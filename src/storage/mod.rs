mod repository;

pub use repository::*;

/// SQL bootstrap for the table that tracks applied migrations
pub const MIGRATION_000_SCHEMA_MIGRATIONS: &str =
    include_str!("migrations/000_schema_migrations.sql");

/// SQL migration for the expenses table
pub const MIGRATION_001_EXPENSES: &str = include_str!("migrations/001_expenses.sql");

/// A versioned schema change, applied at most once per database.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All migrations, in the order they must be applied.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "expenses",
    sql: MIGRATION_001_EXPENSES,
}];
