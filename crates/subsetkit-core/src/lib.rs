pub mod catalog;
pub mod config;
pub mod copy;
pub mod diff;
pub mod error;
pub mod filter;
pub mod graph;
pub mod job;
pub mod sample;
pub mod sql;

// Re-export key types for convenience
pub use error::{Result, SubsetError};
pub use job::JobSpec;
