//! Repository layer
//!
//! Repositories are thin adapters to the outside world: Redash, the result
//! files, the configuration spreadsheet and the chat webhook. They hold no
//! business logic.
//!
//! All repositories are trait-based to enable testing and mocking.

mod jobs;
mod notify;
mod sink;
mod tasks;

// Re-export traits
pub use jobs::JobService;
pub use notify::Notifier;
pub use sink::ResultSink;
pub use tasks::TaskSource;

// Re-export implementations
pub use jobs::RedashJobService;
pub use notify::WebhookNotifier;
pub use sink::CsvResultSink;
pub use tasks::SpreadsheetTaskSource;
