//! Core domain types
//!
//! These types are shared between the HTTP client (which produces remote job
//! state and query results) and the runner (which drives tasks and reports).

pub mod batch;
pub mod failure;
pub mod job;
pub mod outcome;
pub mod result;
pub mod schedule;
pub mod task;
