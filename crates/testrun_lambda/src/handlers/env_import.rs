use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use testrun_core::contract::{environment_fingerprint, format_timestamp, TestEnv};
use testrun_core::error::CoreError;
use testrun_core::pagination::paginate;

use crate::adapters::notifier::Notifier;
use crate::adapters::store::RunStore;
use crate::logging::log_info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportEnvRequest {
    pub env_name: String,
    pub stack_name: String,
    pub region: String,
    pub account_id: String,
    pub alarm_email: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvPage {
    pub total: usize,
    pub test_envs: Vec<TestEnv>,
}

/// Imports a physical target environment. The id is a pure function of the
/// (account, region, stack) triple, so importing the same environment twice
/// returns the existing id without re-provisioning its topic.
pub fn handle_import(
    request: &ImportEnvRequest,
    store: &dyn RunStore,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<String, CoreError> {
    let env_id =
        environment_fingerprint(&request.account_id, &request.region, &request.stack_name);

    if let Some(existing) = store.get_env(&env_id).map_err(CoreError::upstream)? {
        log_info(
            "env_import",
            "import_noop",
            json!({"env_id": existing.id, "stack_name": request.stack_name}),
        );
        return Ok(existing.id);
    }

    let topic_arn = notifier
        .create_topic(&format!("test-env-{env_id}"))
        .map_err(CoreError::upstream)?;
    notifier
        .subscribe_email(&topic_arn, &request.alarm_email)
        .map_err(CoreError::upstream)?;

    let env = TestEnv {
        id: env_id.clone(),
        env_name: request.env_name.clone(),
        region: request.region.clone(),
        account_id: request.account_id.clone(),
        stack_name: request.stack_name.clone(),
        topic_arn,
        project_id: request.project_id.clone(),
        created_at: format_timestamp(now),
    };
    store.put_env(&env).map_err(CoreError::upstream)?;

    log_info(
        "env_import",
        "environment_imported",
        json!({"env_id": env_id, "stack_name": env.stack_name, "region": env.region}),
    );
    Ok(env_id)
}

pub fn handle_delete(env_id: &str, store: &dyn RunStore) -> Result<(), CoreError> {
    store
        .get_env(env_id)
        .map_err(CoreError::upstream)?
        .ok_or_else(|| CoreError::EnvironmentNotFound {
            env_id: env_id.to_string(),
        })?;
    store.delete_env(env_id).map_err(CoreError::upstream)
}

pub fn list_envs(store: &dyn RunStore, page: usize, count: usize) -> Result<EnvPage, CoreError> {
    let mut envs = store.list_envs().map_err(CoreError::upstream)?;
    envs.sort_by(|a, b| a.env_name.cmp(&b.env_name).then(a.id.cmp(&b.id)));
    let (total, test_envs) = paginate(&envs, page, count);
    Ok(EnvPage { total, test_envs })
}

pub fn get_env(store: &dyn RunStore, env_id: &str) -> Result<TestEnv, CoreError> {
    store
        .get_env(env_id)
        .map_err(CoreError::upstream)?
        .ok_or_else(|| CoreError::EnvironmentNotFound {
            env_id: env_id.to_string(),
        })
}
