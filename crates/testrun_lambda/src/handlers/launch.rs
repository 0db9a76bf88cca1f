use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use testrun_core::admission::{decide, Admission, ExclusionPolicy};
use testrun_core::contract::{
    format_timestamp, Parameter, RunMetaData, RunStatus, TestEnv, TestRun,
};
use testrun_core::error::CoreError;
use testrun_core::params::build_environment;

use crate::adapters::job_trigger::JobTrigger;
use crate::adapters::store::RunStore;
use crate::logging::{log_error, log_info};

const RUN_ID_LEN: usize = 16;
const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub marker_id: String,
    #[serde(default)]
    pub test_env_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Static deployment facts resolved once at entry-point construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    pub code_build_project: String,
    pub account_id: String,
    pub region: String,
}

pub fn generate_run_id() -> String {
    let mut rng = rand::thread_rng();
    (0..RUN_ID_LEN)
        .map(|_| HEX_ALPHABET[rng.gen_range(0..HEX_ALPHABET.len())] as char)
        .collect()
}

/// Admits, triggers, and records one test run. Returns the generated run id.
///
/// The trigger call and the record write are not transactional: a trigger
/// failure fails the whole launch before anything is written, while a write
/// failure after a successful trigger leaves an orphan run that is logged
/// loudly for external reconciliation.
pub fn handle_launch(
    request: &LaunchRequest,
    store: &dyn RunStore,
    trigger: &dyn JobTrigger,
    policy: &ExclusionPolicy,
    context: &LaunchContext,
    now: DateTime<Utc>,
) -> Result<String, CoreError> {
    let admission = decide(policy, &request.marker_id, now, |marker_id, limit| {
        store.latest_runs(marker_id, limit)
    })
    .map_err(CoreError::upstream)?;

    if let Admission::Deny { reason } = admission {
        log_info(
            "launch",
            "run_denied",
            json!({"marker_id": request.marker_id, "reason": reason}),
        );
        return Err(CoreError::RunDenied { reason });
    }

    let marker = store
        .get_marker(&request.marker_id)
        .map_err(CoreError::upstream)?
        .ok_or_else(|| CoreError::MarkerNotFound {
            marker_id: request.marker_id.clone(),
        })?;
    let project = store
        .get_project(&marker.project_id)
        .map_err(CoreError::upstream)?
        .ok_or_else(|| CoreError::MarkerNotFound {
            marker_id: request.marker_id.clone(),
        })?;

    let test_env = match request.test_env_id.as_deref() {
        Some(env_id) if !env_id.is_empty() => Some(
            store
                .get_env(env_id)
                .map_err(CoreError::upstream)?
                .ok_or_else(|| CoreError::EnvironmentNotFound {
                    env_id: env_id.to_string(),
                })?,
        ),
        // Absent id targets the default/legacy environment.
        _ => None,
    };

    let environment = build_environment(&project, &marker, test_env.as_ref(), &request.parameters)?;

    let code_build_arn = trigger
        .start_build(&context.code_build_project, &environment)
        .map_err(CoreError::upstream)?;

    let timestamp = format_timestamp(now);
    let run = TestRun {
        id: generate_run_id(),
        marker_id: marker.id.clone(),
        created_at: timestamp.clone(),
        updated_at: timestamp,
        status: RunStatus::Running,
        duration: 0,
        parameters: request.parameters.clone(),
        test_env_id: test_env.as_ref().map(|env| env.id.clone()),
        code_build_arn: code_build_arn.clone(),
        meta_data: run_meta_data(test_env.as_ref(), context),
        result: Vec::new(),
        passed: 0,
        failed: 0,
        total: 0,
    };

    if let Err(error) = store.put_run(&run) {
        log_error(
            "launch",
            "orphan_run",
            json!({
                "run_id": run.id,
                "marker_id": run.marker_id,
                "code_build_arn": code_build_arn,
                "error": error,
            }),
        );
        return Err(CoreError::upstream(error));
    }

    log_info(
        "launch",
        "run_started",
        json!({
            "run_id": run.id,
            "marker_id": run.marker_id,
            "code_build_arn": code_build_arn,
        }),
    );

    Ok(run.id)
}

fn run_meta_data(test_env: Option<&TestEnv>, context: &LaunchContext) -> RunMetaData {
    match test_env {
        Some(env) => RunMetaData {
            account_id: env.account_id.clone(),
            region: env.region.clone(),
            stack_name: env.stack_name.clone(),
        },
        None => RunMetaData {
            account_id: context.account_id.clone(),
            region: context.region.clone(),
            stack_name: String::new(),
        },
    }
}
