//! Scheduler layer for the runner
//!
//! This layer drives query tasks through their remote lifecycle, fans a batch
//! out to one poller per task, chains batches with message dispatch, and
//! fires the daily schedule.

pub mod batch;
pub mod clock;
pub mod pipeline;
pub mod poller;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::BatchOrchestrator;
pub use clock::ScheduleLoop;
pub use pipeline::Pipeline;
pub use poller::PollPolicy;
