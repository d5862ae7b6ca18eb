pub mod application;
pub mod cli;
pub mod domain;
pub mod http;
pub mod storage;
pub mod telemetry;

pub use application::{ExpenseService, ServiceError};
pub use domain::*;
pub use storage::ExpenseRepository;
