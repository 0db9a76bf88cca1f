use chrono::{DateTime, Utc};
use serde_json::json;
use testrun_core::contract::{
    format_timestamp, Marker, Project, RunStatus, TestEnv, TestRun, RESULT_FIELD_SENTINEL,
};
use testrun_core::error::CoreError;
use testrun_core::keys;
use testrun_core::report::{parse_report, ReportEnvelope};

use crate::adapters::notifier::Notifier;
use crate::adapters::object_reader::ObjectReader;
use crate::adapters::store::RunStore;
use crate::logging::{log_error, log_info};

const TRACE_EXCERPT_LEN: usize = 400;

/// Ingests one raw report object: parse, blind-update the targeted run, then
/// notify best-effort. Replaying the same object with the same clock
/// converges to the same final record.
pub fn handle_report_object(
    bucket: &str,
    key: &str,
    reader: &dyn ObjectReader,
    store: &dyn RunStore,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    let raw = reader
        .read_object(bucket, key)
        .map_err(CoreError::upstream)?;

    let envelope = parse_report(&raw)?;

    let updated_at = format_timestamp(now);
    store
        .apply_result(&envelope.pk, &envelope.sk, &envelope.outcome, &updated_at)
        .map_err(CoreError::upstream)?;

    log_info(
        "ingest",
        "result_recorded",
        json!({
            "pk": envelope.pk,
            "sk": envelope.sk,
            "status": envelope.outcome.status.as_str(),
            "passed": envelope.outcome.passed,
            "total": envelope.outcome.total,
            "object_key": key,
        }),
    );

    notify_result(&envelope, store, notifier);
    Ok(())
}

/// Notification is strictly best-effort: every failure on this path is
/// logged and swallowed so it can never fail the ingestion itself.
fn notify_result(envelope: &ReportEnvelope, store: &dyn RunStore, notifier: &dyn Notifier) {
    let (_, run_id) = keys::decode(&envelope.pk);

    let run = match store.get_run(run_id) {
        Ok(Some(run)) => run,
        Ok(None) => {
            log_error(
                "ingest",
                "notification_skipped",
                json!({"run_id": run_id, "reason": "run record not found"}),
            );
            return;
        }
        Err(error) => {
            log_error(
                "ingest",
                "notification_skipped",
                json!({"run_id": run_id, "error": error}),
            );
            return;
        }
    };

    let Some(env_id) = run.test_env_id.clone() else {
        log_info(
            "ingest",
            "notification_skipped",
            json!({"run_id": run.id, "reason": "run has no target environment"}),
        );
        return;
    };

    let env = match store.get_env(&env_id) {
        Ok(Some(env)) => env,
        Ok(None) => {
            log_error(
                "ingest",
                "notification_skipped",
                json!({"run_id": run.id, "env_id": env_id, "reason": "environment not found"}),
            );
            return;
        }
        Err(error) => {
            log_error(
                "ingest",
                "notification_skipped",
                json!({"run_id": run.id, "env_id": env_id, "error": error}),
            );
            return;
        }
    };

    let marker = store.get_marker(&run.marker_id).ok().flatten();
    let project = marker
        .as_ref()
        .and_then(|marker| store.get_project(&marker.project_id).ok().flatten());

    let (subject, message) = compose_summary(&run, marker.as_ref(), project.as_ref(), &env);
    match notifier.publish(&env.topic_arn, &subject, &message) {
        Ok(()) => log_info(
            "ingest",
            "notification_published",
            json!({"run_id": run.id, "topic_arn": env.topic_arn}),
        ),
        Err(error) => log_error(
            "ingest",
            "notification_failed",
            json!({"run_id": run.id, "topic_arn": env.topic_arn, "error": error}),
        ),
    }
}

fn compose_summary(
    run: &TestRun,
    marker: Option<&Marker>,
    project: Option<&Project>,
    env: &TestEnv,
) -> (String, String) {
    let glyph = match run.status {
        RunStatus::Pass => "✅",
        _ => "❌",
    };
    let marker_name = marker.map(|marker| marker.name.as_str()).unwrap_or(&run.marker_id);
    let project_name = project.map(|project| project.name.as_str()).unwrap_or("unknown");
    let model_name = marker.map(|marker| marker.model_name.as_str()).unwrap_or("unknown");

    let parameters = if run.parameters.is_empty() {
        "none".to_string()
    } else {
        run.parameters
            .iter()
            .map(|parameter| format!("{}={}", parameter.parameter_key, parameter.parameter_value))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let subject = format!("Test {}: {marker_name}", run.status.as_str());
    let message = format!(
        "{glyph} {}\n\
         Project: {project_name}\n\
         Target: {model_name} @ {} ({})\n\
         Parameters: {parameters}\n\
         {} of {} tests passed in {}s\n\
         Trace: {}\n",
        run.status.as_str(),
        env.stack_name,
        env.region,
        run.passed,
        run.total,
        run.duration,
        trace_excerpt(run),
    );

    (subject, message)
}

fn trace_excerpt(run: &TestRun) -> String {
    run.result
        .iter()
        .find(|entry| entry.trace != RESULT_FIELD_SENTINEL)
        .map(|entry| entry.trace.chars().take(TRACE_EXCERPT_LEN).collect())
        .unwrap_or_else(|| RESULT_FIELD_SENTINEL.to_string())
}
