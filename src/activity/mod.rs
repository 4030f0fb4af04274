//! Activity tracking for the gas monitor.
//!
//! Keeps auditable counts of what the agent did across runs.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, ActivityLog, ActivityStats,
    SharedActivityLog,
};
