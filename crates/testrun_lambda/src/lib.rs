//! AWS-oriented adapters and handlers for test-run orchestration.
//!
//! This crate owns runtime integration details (Lambda entry points, the
//! DynamoDB-backed run store, the CodeBuild trigger, and SNS notification)
//! around the pure orchestration behavior in `testrun_core`.

pub mod adapters;
pub mod handlers;
pub mod logging;

#[cfg(test)]
pub mod test_support;
