//! Relay Core
//!
//! Core types for the Relay reporting runner.
//!
//! This crate contains:
//! - Domain types: tasks, remote job state, outcomes, failure records, schedules
//! - DTOs: the Redash wire format

pub mod domain;
pub mod dto;
