/// Submission and status types
pub mod request;

/// Query service seam and its Redshift Data API implementation
pub mod service;

/// Submit and poll until terminal
pub mod executor;

/// Multi-row INSERT for event batches
pub mod insert;

/// Schema, view and materialized view setup
pub mod setup;

/// Scripted in-memory query service
#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use executor::{IgnorableErrors, PollPolicy, Statement, StatementExecutor};
pub use insert::InsertStatement;
pub use request::{ExecutionContext, StatementHandle, StatementRequest, StatementState, StatementStatus};
pub use service::{RedshiftDataService, StatementService};
pub use setup::{load_statement_dir, run_setup, SetupPlan};
