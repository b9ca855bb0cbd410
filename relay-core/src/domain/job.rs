//! Remote job domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a Redash job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Queued,
    Executing,
    Success,
    Failed,
    Cancelled,
}

impl RemoteStatus {
    /// Maps the numeric status Redash puts on the wire
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Queued),
            2 => Some(Self::Executing),
            3 => Some(Self::Success),
            4 => Some(Self::Failed),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Executing => write!(f, "executing"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Snapshot of a remote job returned by one poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub status: RemoteStatus,
    pub query_result_id: Option<u64>,
    pub error: Option<String>,
}

impl JobState {
    pub fn new(status: RemoteStatus) -> Self {
        Self {
            status,
            query_result_id: None,
            error: None,
        }
    }

    pub fn succeeded(query_result_id: u64) -> Self {
        Self {
            status: RemoteStatus::Success,
            query_result_id: Some(query_result_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Failed,
            query_result_id: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RemoteStatus::from_code(1), Some(RemoteStatus::Queued));
        assert_eq!(RemoteStatus::from_code(2), Some(RemoteStatus::Executing));
        assert_eq!(RemoteStatus::from_code(3), Some(RemoteStatus::Success));
        assert_eq!(RemoteStatus::from_code(4), Some(RemoteStatus::Failed));
        assert_eq!(RemoteStatus::from_code(5), Some(RemoteStatus::Cancelled));
        assert_eq!(RemoteStatus::from_code(0), None);
        assert_eq!(RemoteStatus::from_code(9), None);
    }
}
