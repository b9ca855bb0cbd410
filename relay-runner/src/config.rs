//! Runner configuration
//!
//! Defines all configurable parameters for the runner: where Redash and the
//! webhook live, where task configuration is read from, where results are
//! written, and the polling and retry timings.

use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::PollPolicy;

/// Where the configuration tabs are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLocation {
    /// Published Google Sheet, read through its CSV export
    Sheet(String),
    /// Directory holding one `<tab>.csv` file per tab
    Dir(PathBuf),
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Redash base URL (e.g., "https://redash.example.com")
    pub redash_domain: String,

    /// Webhook receiving batch reports and pipeline errors
    pub webhook_url: String,

    /// Source of the task configuration tabs
    pub tasks: TaskLocation,

    /// Directory query results are written to
    pub data_path: PathBuf,

    /// Pause between two status polls of the same job
    pub poll_interval: Duration,

    /// Attempts per task before it is reported as failed
    pub max_attempts: u32,

    /// Pause between two attempts of the same task
    pub retry_delay: Duration,

    /// Upper bound for a single attempt; `None` waits forever
    pub task_timeout: Option<Duration>,

    /// Wait after the query batch so result files can sync before reporting
    pub sync_delay: Duration,

    /// Directory receiving one log file per run, next to the console output
    pub log_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(redash_domain: String, webhook_url: String, tasks: TaskLocation) -> Self {
        Self {
            redash_domain,
            webhook_url,
            tasks,
            data_path: PathBuf::from("./data"),
            poll_interval: Duration::from_millis(1000),
            max_attempts: 5,
            retry_delay: Duration::from_millis(1000),
            task_timeout: Some(Duration::from_secs(1800)), // 30 minutes
            sync_delay: Duration::from_secs(15),
            log_path: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Only the process environment is read; a `.env` file is not loaded, so
    /// export the variables (or source the file) before starting the runner.
    ///
    /// Expected environment variables:
    /// - REDASH_DOMAIN (required)
    /// - WEBHOOK_URL (required)
    /// - SHEET_ID or TASKS_DIR (one is required; TASKS_DIR wins)
    /// - DATA_PATH (optional, default: ./data)
    /// - POLL_INTERVAL_MS (optional, default: 1000)
    /// - MAX_ATTEMPTS (optional, default: 5)
    /// - RETRY_DELAY_MS (optional, default: 1000)
    /// - TASK_TIMEOUT (optional, seconds, default: 1800, 0 disables)
    /// - SYNC_DELAY (optional, seconds, default: 15)
    /// - LOG_PATH (optional, directory for per-run log files)
    pub fn from_env() -> anyhow::Result<Self> {
        let redash_domain = std::env::var("REDASH_DOMAIN")
            .map_err(|_| anyhow::anyhow!("REDASH_DOMAIN environment variable not set"))?;

        let webhook_url = std::env::var("WEBHOOK_URL")
            .map_err(|_| anyhow::anyhow!("WEBHOOK_URL environment variable not set"))?;

        let tasks = match (std::env::var("TASKS_DIR"), std::env::var("SHEET_ID")) {
            (Ok(dir), _) => TaskLocation::Dir(PathBuf::from(dir)),
            (Err(_), Ok(sheet_id)) => TaskLocation::Sheet(sheet_id),
            _ => anyhow::bail!("either SHEET_ID or TASKS_DIR must be set"),
        };

        let mut config = Self::new(redash_domain, webhook_url, tasks);

        if let Ok(path) = std::env::var("DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }

        if let Some(ms) = env_number::<u64>("POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }

        if let Some(attempts) = env_number::<u32>("MAX_ATTEMPTS") {
            config.max_attempts = attempts;
        }

        if let Some(ms) = env_number::<u64>("RETRY_DELAY_MS") {
            config.retry_delay = Duration::from_millis(ms);
        }

        if let Some(secs) = env_number::<u64>("TASK_TIMEOUT") {
            config.task_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(secs) = env_number::<u64>("SYNC_DELAY") {
            config.sync_delay = Duration::from_secs(secs);
        }

        if let Ok(path) = std::env::var("LOG_PATH") {
            if !path.trim().is_empty() {
                config.log_path = Some(PathBuf::from(path.trim()));
            }
        }

        Ok(config)
    }

    /// Polling and retry settings handed to each job poller
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            poll_interval: self.poll_interval,
            max_attempts: self.max_attempts,
            retry_delay: self.retry_delay,
            task_timeout: self.task_timeout,
        }
    }

    /// Log file of a run started at `started_at`, when file logging is on
    pub fn log_file(&self, started_at: NaiveDateTime) -> Option<PathBuf> {
        self.log_path.as_ref().map(|dir| {
            dir.join(format!("{}.txt", started_at.format("%Y_%m_%d_%H_%M_%S")))
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("redash_domain", &self.redash_domain),
            ("webhook_url", &self.webhook_url),
        ] {
            if url.is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }

            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        match &self.tasks {
            TaskLocation::Sheet(id) if id.trim().is_empty() => {
                anyhow::bail!("sheet id cannot be empty")
            }
            TaskLocation::Dir(dir) if dir.as_os_str().is_empty() => {
                anyhow::bail!("tasks directory cannot be empty")
            }
            _ => {}
        }

        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}
