mod expense;

pub use expense::*;
