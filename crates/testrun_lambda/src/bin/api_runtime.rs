use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use testrun_core::admission::ExclusionPolicy;
use testrun_core::error::CoreError;
use testrun_lambda::adapters::codebuild::CodeBuildJobTrigger;
use testrun_lambda::adapters::dynamo::DynamoRunStore;
use testrun_lambda::adapters::job_trigger::JobTrigger;
use testrun_lambda::adapters::notifier::Notifier;
use testrun_lambda::adapters::sns::SnsNotifier;
use testrun_lambda::adapters::store::RunStore;
use testrun_lambda::handlers::env_import::{self, ImportEnvRequest};
use testrun_lambda::handlers::launch::{handle_launch, LaunchContext, LaunchRequest};
use testrun_lambda::handlers::query;

const DEFAULT_PAGE_SIZE: usize = 20;

struct ApiDependencies<'a> {
    store: &'a dyn RunStore,
    trigger: &'a dyn JobTrigger,
    notifier: &'a dyn Notifier,
    policy: &'a ExclusionPolicy,
    context: &'a LaunchContext,
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(30))
                .operation_attempt_timeout(Duration::from_secs(10))
                .build(),
        )
        .load()
        .await;

    let table_name =
        std::env::var("TABLE").map_err(|_| Error::from("TABLE must be configured"))?;
    let context = LaunchContext {
        code_build_project: std::env::var("CODEBUILD_PROJECT_NAME")
            .map_err(|_| Error::from("CODEBUILD_PROJECT_NAME must be configured"))?,
        account_id: std::env::var("ACCOUNT_ID")
            .map_err(|_| Error::from("ACCOUNT_ID must be configured"))?,
        region: std::env::var("REGION").map_err(|_| Error::from("REGION must be configured"))?,
    };
    let policy = match std::env::var("EXCLUSIVE_MARKER_GROUPS") {
        Ok(raw) => ExclusionPolicy::from_json(&raw).map_err(Error::from)?,
        Err(_) => ExclusionPolicy::default(),
    };

    let store = DynamoRunStore::new(table_name, aws_sdk_dynamodb::Client::new(&aws_config));
    let trigger = CodeBuildJobTrigger::new(aws_sdk_codebuild::Client::new(&aws_config));
    let notifier = SnsNotifier::new(aws_sdk_sns::Client::new(&aws_config));

    resolve_operation(
        &event.payload,
        &ApiDependencies {
            store: &store,
            trigger: &trigger,
            notifier: &notifier,
            policy: &policy,
            context: &context,
        },
    )
}

fn resolve_operation(event: &Value, deps: &ApiDependencies<'_>) -> Result<Value, Error> {
    let field = field_name(event).ok_or_else(|| Error::from("event carries no field name"))?;
    let args = arguments(event);

    match field {
        "startSingleTest" => {
            let request: LaunchRequest = serde_json::from_value(args.clone())
                .map_err(|error| Error::from(format!("malformed launch arguments: {error}")))?;
            let run_id = handle_launch(
                &request,
                deps.store,
                deps.trigger,
                deps.policy,
                deps.context,
                Utc::now(),
            )
            .map_err(core_failure)?;
            Ok(Value::String(run_id))
        }
        "listTestCheckPoints" => {
            let response =
                query::list_check_points(deps.store, page_arg(&args), count_arg(&args))
                    .map_err(core_failure)?;
            encode_response(&response)
        }
        "listTestHistory" => {
            let marker_id = required_id(&args)?;
            let response = query::list_history(
                deps.store,
                marker_id,
                page_arg(&args),
                count_arg(&args),
            )
            .map_err(core_failure)?;
            encode_response(&response)
        }
        "getTestHistory" => {
            let run_id = required_id(&args)?;
            let run = query::get_run(deps.store, run_id).map_err(core_failure)?;
            encode_response(&run)
        }
        "importTestEnv" => {
            let request: ImportEnvRequest = serde_json::from_value(args.clone())
                .map_err(|error| Error::from(format!("malformed import arguments: {error}")))?;
            let env_id = env_import::handle_import(&request, deps.store, deps.notifier, Utc::now())
                .map_err(core_failure)?;
            Ok(Value::String(env_id))
        }
        "deleteTestEnv" => {
            let env_id = required_id(&args)?;
            env_import::handle_delete(env_id, deps.store).map_err(core_failure)?;
            Ok(Value::Bool(true))
        }
        "listTestEnvs" => {
            let response = env_import::list_envs(deps.store, page_arg(&args), count_arg(&args))
                .map_err(core_failure)?;
            encode_response(&response)
        }
        "getTestEnv" => {
            let env_id = required_id(&args)?;
            let env = env_import::get_env(deps.store, env_id).map_err(core_failure)?;
            encode_response(&env)
        }
        other => Err(Error::from(format!("unknown operation '{other}'"))),
    }
}

fn field_name(event: &Value) -> Option<&str> {
    event
        .get("info")
        .and_then(|info| info.get("fieldName"))
        .and_then(Value::as_str)
        .or_else(|| event.get("field").and_then(Value::as_str))
}

fn arguments(event: &Value) -> Value {
    event.get("arguments").cloned().unwrap_or_else(|| json!({}))
}

fn required_id(args: &Value) -> Result<&str, Error> {
    args.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::from("operation requires an 'id' argument"))
}

fn page_arg(args: &Value) -> usize {
    args.get("page").and_then(Value::as_u64).unwrap_or(1) as usize
}

fn count_arg(args: &Value) -> usize {
    args.get("count")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_PAGE_SIZE as u64) as usize
}

fn encode_response(payload: &impl serde::Serialize) -> Result<Value, Error> {
    serde_json::to_value(payload)
        .map_err(|error| Error::from(format!("failed to serialize api response: {error}")))
}

fn core_failure(error: CoreError) -> Error {
    Error::from(format!("[{}] {error}", error.code()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
