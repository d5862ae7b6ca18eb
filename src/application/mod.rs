// Application layer: the expense data service and its typed failures.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
