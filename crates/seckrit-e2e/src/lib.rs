//! End-to-end test utilities for seckrit
//!
//! This crate provides test harnesses and utilities for running the fetch
//! loop end to end without requiring a real Google Cloud project.

pub mod harness;
pub mod mock_secret_manager;
pub mod mock_store;

pub use harness::{init_test, TestWorkspace};
pub use mock_secret_manager::{MockSecretManager, RecordedRequest};
pub use mock_store::MockSecretStore;
