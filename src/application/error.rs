use thiserror::Error;

use crate::domain::{ExpenseId, InvalidExpense};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("service/database is closed")]
    Closed,

    #[error(transparent)]
    InvalidExpense(#[from] InvalidExpense),

    #[error("expense {0} not found")]
    NoExpense(ExpenseId),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ServiceError {
    /// A store call can still reach the pool after `close` won the race with
    /// the open check; sqlx reports that as `PoolClosed`, which is `Closed` here.
    fn from(err: anyhow::Error) -> Self {
        let pool_closed = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<sqlx::Error>(),
                Some(sqlx::Error::PoolClosed)
            )
        });

        if pool_closed {
            ServiceError::Closed
        } else {
            ServiceError::Internal(err)
        }
    }
}
