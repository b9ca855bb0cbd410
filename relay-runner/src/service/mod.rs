//! Service layer
//!
//! Services hold the runner's business logic that is not tied to the job
//! lifecycle: failure bookkeeping, report rendering and message dispatch.

mod dispatch;
mod recorder;
pub mod report;

// Re-export traits
pub use recorder::FailureRecorder;

// Re-export implementations
pub use dispatch::MessageDispatcher;
pub use recorder::InMemoryFailureRecorder;
