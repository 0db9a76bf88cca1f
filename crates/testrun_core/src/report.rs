use serde_json::Value;

use crate::contract::{RunStatus, TestResultEntry, RESULT_FIELD_SENTINEL};
use crate::error::CoreError;

/// A raw report envelope, addressed at a single run record by the exact
/// key pair the launcher wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEnvelope {
    pub pk: String,
    pub sk: String,
    pub outcome: ReportOutcome,
}

/// Canonical reduction of a framework report: the terminal status plus the
/// counts and per-test projections persisted onto the run record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub status: RunStatus,
    pub passed: u64,
    pub failed: u64,
    pub total: u64,
    pub duration: i64,
    pub results: Vec<TestResultEntry>,
}

/// A run passes only when every collected test is accounted for as passed.
/// Tests that errored or were skipped out of the `passed` count fail the
/// run even when `failed` is zero.
pub fn reduce_status(passed: u64, total: u64) -> RunStatus {
    if total == passed {
        RunStatus::Pass
    } else {
        RunStatus::Failed
    }
}

pub fn parse_report(raw: &[u8]) -> Result<ReportEnvelope, CoreError> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|error| CoreError::invalid_report(format!("payload is not JSON: {error}")))?;

    let pk = required_string(&document, "pk")?;
    let sk = required_string(&document, "sk")?;

    let summary = document
        .get("summary")
        .filter(|value| value.is_object())
        .ok_or_else(|| CoreError::invalid_report("report is missing the summary block"))?;
    let tests = document
        .get("tests")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::invalid_report("report is missing the tests block"))?;

    let passed = count_field(summary, "passed");
    let failed = count_field(summary, "failed");
    let total = count_field(summary, "total");
    let duration = document.get("duration").map_or(0, integer_seconds);

    let results = tests.iter().map(project_test_entry).collect();

    Ok(ReportEnvelope {
        pk,
        sk,
        outcome: ReportOutcome {
            status: reduce_status(passed, total),
            passed,
            failed,
            total,
            duration,
            results,
        },
    })
}

fn required_string(document: &Value, field: &str) -> Result<String, CoreError> {
    document
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CoreError::invalid_report(format!("report is missing the '{field}' key")))
}

fn count_field(summary: &Value, field: &str) -> u64 {
    summary.get(field).and_then(Value::as_u64).unwrap_or(0)
}

fn integer_seconds(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|seconds| seconds as i64))
        .unwrap_or(0)
}

fn project_test_entry(test: &Value) -> TestResultEntry {
    let call = test.get("call");
    let message = call
        .and_then(|call| call.get("crash"))
        .and_then(|crash| crash.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(RESULT_FIELD_SENTINEL);
    let trace = call
        .and_then(|call| call.get("longrepr"))
        .and_then(Value::as_str)
        .unwrap_or(RESULT_FIELD_SENTINEL);

    TestResultEntry {
        message: message.to_string(),
        trace: trace.to_string(),
    }
}
