use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{Expense, ExpenseId};
use crate::storage::ExpenseRepository;

use super::ServiceError;

/// Application service owning expense persistence and its lifecycle.
/// This is the primary interface for any client (HTTP, CLI, tests).
///
/// The service is safe to share between tasks: the only mutable state outside
/// the database is the closed flag, which is atomic. Once [`close`] succeeds
/// every operation fails with [`ServiceError::Closed`]; a fresh service has
/// to be constructed to talk to the store again.
///
/// Each async operation can be cancelled by dropping its future. The pool
/// takes the connection back and the service remains usable.
///
/// [`close`]: ExpenseService::close
pub struct ExpenseService {
    repo: ExpenseRepository,
    closed: AtomicBool,
}

impl ExpenseService {
    /// Create a new expense service with the given repository.
    pub fn new(repo: ExpenseRepository) -> Self {
        Self {
            repo,
            closed: AtomicBool::new(false),
        }
    }

    /// Connect to the database at `database_url` and apply pending migrations.
    pub async fn init(database_url: &str) -> Result<Self, ServiceError> {
        let repo = ExpenseRepository::init(database_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing, already migrated database.
    pub async fn connect(database_url: &str) -> Result<Self, ServiceError> {
        let repo = ExpenseRepository::connect(database_url).await?;
        Ok(Self::new(repo))
    }

    /// Returns true once [`ExpenseService::close`] has succeeded.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the underlying pool. A second call fails with `Closed`, so it is
    /// safe to call speculatively during shutdown.
    pub async fn close(&self) -> Result<(), ServiceError> {
        // Flip the flag before the pool goes away so no caller can observe an
        // open service backed by a closed pool.
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ServiceError::Closed)?;
        self.repo.close().await;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ServiceError> {
        if self.is_closed() {
            return Err(ServiceError::Closed);
        }
        Ok(())
    }

    // ========================
    // Expense operations
    // ========================

    /// Sanitize, validate and store a new expense.
    /// Any id on the input is ignored; the returned expense carries the
    /// store-assigned one.
    pub async fn create(&self, expense: &Expense) -> Result<Expense, ServiceError> {
        self.ensure_open()?;

        let expense = expense.sanitize();
        expense.validate()?;

        Ok(self.repo.insert_expense(&expense).await?)
    }

    /// Get an expense by ID.
    pub async fn get(&self, id: ExpenseId) -> Result<Expense, ServiceError> {
        self.ensure_open()?;

        self.repo
            .get_expense(id)
            .await?
            .ok_or(ServiceError::NoExpense(id))
    }

    /// List every expense in ascending ID order.
    pub async fn list(&self) -> Result<Vec<Expense>, ServiceError> {
        self.ensure_open()?;

        Ok(self.repo.list_expenses().await?)
    }

    /// Replace the stored fields of the expense addressed by `expense.id`.
    /// Runs the same sanitize and validate pipeline as [`ExpenseService::create`].
    /// An expense that was never persisted (id `0`) fails with `NoExpense`.
    pub async fn update(&self, expense: &Expense) -> Result<Expense, ServiceError> {
        self.ensure_open()?;

        if !expense.is_persisted() {
            return Err(ServiceError::NoExpense(expense.id));
        }

        let expense = expense.sanitize();
        expense.validate()?;

        self.repo
            .update_expense(&expense)
            .await?
            .ok_or(ServiceError::NoExpense(expense.id))
    }
}
