pub mod fixtures;
pub mod test_env;

// Re-export key testing utilities
pub use fixtures::{BatchFormat, BatchRow, sales_batch};
pub use test_env::{CommandOutput, TestEnvironment};
