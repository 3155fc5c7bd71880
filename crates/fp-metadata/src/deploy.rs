//! Deploy job types.

use serde::{Deserialize, Serialize};

/// Test level for deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TestLevel {
    /// No tests run.
    NoTestRun,
    /// Run local tests only.
    #[default]
    RunLocalTests,
    /// Run all tests in org.
    RunAllTestsInOrg,
    /// Run specified tests.
    RunSpecifiedTests,
}

impl std::fmt::Display for TestLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestLevel::NoTestRun => write!(f, "NoTestRun"),
            TestLevel::RunLocalTests => write!(f, "RunLocalTests"),
            TestLevel::RunAllTestsInOrg => write!(f, "RunAllTestsInOrg"),
            TestLevel::RunSpecifiedTests => write!(f, "RunSpecifiedTests"),
        }
    }
}

/// Options for deployment, passed through to the server verbatim.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Allow references to missing files in the zip.
    pub allow_missing_files: bool,
    /// Automatically update the package manifest.
    pub auto_update_package: bool,
    /// Validate only, don't actually deploy.
    pub check_only: bool,
    /// Ignore warnings during deployment.
    pub ignore_warnings: bool,
    /// Hard delete components named in `destructiveChanges.xml`.
    pub purge_on_delete: bool,
    /// Rollback all changes if any component fails.
    pub rollback_on_error: bool,
    /// Deploy as a single package.
    pub single_package: bool,
    /// Test level for deployment.
    pub test_level: Option<TestLevel>,
    /// Specific tests to run (when test_level is RunSpecifiedTests).
    pub run_tests: Vec<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            allow_missing_files: false,
            auto_update_package: false,
            check_only: false,
            ignore_warnings: true,
            purge_on_delete: false,
            rollback_on_error: true,
            single_package: true,
            test_level: None,
            run_tests: vec![],
        }
    }
}

/// Server-reported status of a deploy job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployStatus {
    Queued,
    Pending,
    InProgress,
    Succeeded,
    SucceededPartial,
    Failed,
    Canceling,
    Canceled,
}

impl DeployStatus {
    /// Whether the job is still running and worth polling again.
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            DeployStatus::Queued | DeployStatus::Pending | DeployStatus::InProgress
        )
    }
}

impl std::str::FromStr for DeployStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(DeployStatus::Queued),
            "Pending" => Ok(DeployStatus::Pending),
            "InProgress" => Ok(DeployStatus::InProgress),
            "Succeeded" => Ok(DeployStatus::Succeeded),
            "SucceededPartial" => Ok(DeployStatus::SucceededPartial),
            "Failed" => Ok(DeployStatus::Failed),
            "Canceling" => Ok(DeployStatus::Canceling),
            "Canceled" => Ok(DeployStatus::Canceled),
            _ => Err(format!("Unknown deploy status: {}", s)),
        }
    }
}

impl std::fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeployStatus::Queued => "Queued",
            DeployStatus::Pending => "Pending",
            DeployStatus::InProgress => "InProgress",
            DeployStatus::Succeeded => "Succeeded",
            DeployStatus::SucceededPartial => "SucceededPartial",
            DeployStatus::Failed => "Failed",
            DeployStatus::Canceling => "Canceling",
            DeployStatus::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// Result of a deploy status check.
#[derive(Debug, Clone)]
pub struct DeployResult {
    /// Async job ID. Hand this to `deploy_recent_validation` to promote a
    /// validated check-only deploy.
    pub id: String,
    /// Whether the operation is complete.
    pub done: bool,
    /// Current status.
    pub status: DeployStatus,
    /// Whether the deployment succeeded.
    pub success: bool,
    /// Error message if failed.
    pub error_message: Option<String>,
    /// Additional state detail from the server.
    pub state_detail: Option<String>,
    pub number_components_deployed: u32,
    pub number_components_errors: u32,
    pub number_components_total: u32,
    pub number_tests_completed: u32,
    pub number_tests_errors: u32,
    pub number_tests_total: u32,
    /// Per-component failures.
    pub component_failures: Vec<ComponentFailure>,
}

impl DeployResult {
    /// The most useful failure description the server provided.
    pub fn detail_message(&self) -> Option<String> {
        self.error_message
            .clone()
            .or_else(|| self.state_detail.clone())
    }
}

/// A component failure in a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentFailure {
    pub component_type: Option<String>,
    pub file_name: Option<String>,
    pub full_name: Option<String>,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub problem: String,
    pub problem_type: String,
}
