use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Wire timestamp format for every persisted record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Placeholder stored when a report omits a per-test message or trace.
pub const RESULT_FIELD_SENTINEL: &str = "N/A";

const ENV_FINGERPRINT_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAILED")]
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Pass => "PASS",
            Self::Failed => "FAILED",
        }
    }
}

/// Latest-run status projected per marker. `Unknown` means the marker has
/// never produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckPointStatus {
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl From<Option<RunStatus>> for CheckPointStatus {
    fn from(status: Option<RunStatus>) -> Self {
        match status {
            Some(RunStatus::Running) => Self::Running,
            Some(RunStatus::Pass) => Self::Pass,
            Some(RunStatus::Failed) => Self::Failed,
            None => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repo_url: String,
    pub branch: String,
    pub default_region: String,
    pub project_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestEnv {
    pub id: String,
    pub env_name: String,
    pub region: String,
    pub account_id: String,
    pub stack_name: String,
    pub topic_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetaData {
    pub account_id: String,
    pub region: String,
    pub stack_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestResultEntry {
    pub message: String,
    pub trace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: String,
    pub marker_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: RunStatus,
    pub duration: i64,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_env_id: Option<String>,
    pub code_build_arn: String,
    pub meta_data: RunMetaData,
    #[serde(default)]
    pub result: Vec<TestResultEntry>,
    #[serde(default)]
    pub passed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub total: u64,
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a wire timestamp. Records carrying anything else are treated as
/// stale by the admission guard, so this returns `None` rather than failing.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Derives the stable environment id from the physical target identity.
/// Importing the same (account, region, stack) triple always yields the
/// same id, which is what makes re-imports upserts instead of duplicates.
pub fn environment_fingerprint(account_id: &str, region: &str, stack_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update(b"#");
    hasher.update(region.as_bytes());
    hasher.update(b"#");
    hasher.update(stack_name.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..ENV_FINGERPRINT_LEN].to_string()
}
