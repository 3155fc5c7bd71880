//! Retrieve job types.

use serde::{Deserialize, Serialize};

/// Server-reported status of a retrieve job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrieveStatus {
    Queued,
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Canceling,
    Canceled,
}

impl RetrieveStatus {
    /// Whether the job is still running and worth polling again.
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            RetrieveStatus::Queued | RetrieveStatus::Pending | RetrieveStatus::InProgress
        )
    }
}

impl std::str::FromStr for RetrieveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(RetrieveStatus::Queued),
            "Pending" => Ok(RetrieveStatus::Pending),
            "InProgress" => Ok(RetrieveStatus::InProgress),
            "Succeeded" => Ok(RetrieveStatus::Succeeded),
            "Failed" => Ok(RetrieveStatus::Failed),
            "Canceling" => Ok(RetrieveStatus::Canceling),
            "Canceled" => Ok(RetrieveStatus::Canceled),
            _ => Err(format!("Unknown retrieve status: {}", s)),
        }
    }
}

impl std::fmt::Display for RetrieveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RetrieveStatus::Queued => "Queued",
            RetrieveStatus::Pending => "Pending",
            RetrieveStatus::InProgress => "InProgress",
            RetrieveStatus::Succeeded => "Succeeded",
            RetrieveStatus::Failed => "Failed",
            RetrieveStatus::Canceling => "Canceling",
            RetrieveStatus::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// Result of a retrieve status check.
#[derive(Debug, Clone)]
pub struct RetrieveResult {
    /// Async job ID.
    pub id: String,
    /// Whether the operation is complete.
    pub done: bool,
    /// Current status.
    pub status: RetrieveStatus,
    /// Whether the retrieve succeeded.
    pub success: bool,
    /// Error message if failed.
    pub error_message: Option<String>,
    /// Error status code if failed.
    pub error_status_code: Option<String>,
    /// Base64-encoded zip contents. Left encoded; decoding is the archive
    /// helpers' job.
    pub zip_file: Option<String>,
    /// Properties of the files in the retrieved package.
    pub file_properties: Vec<FileProperties>,
    /// Warnings and problems reported alongside the result.
    pub messages: Vec<RetrieveMessage>,
}

/// A warning or problem attached to a retrieve result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveMessage {
    pub file_name: String,
    pub problem: String,
}

/// Properties of one file in a retrieved package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProperties {
    pub file_name: String,
    pub full_name: String,
    pub id: String,
    pub component_type: String,
    pub created_by_name: String,
    pub created_date: String,
    pub last_modified_by_name: String,
    pub last_modified_date: String,
    pub manageable_state: Option<String>,
    pub namespace_prefix: Option<String>,
}
