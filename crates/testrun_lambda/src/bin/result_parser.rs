use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use testrun_core::error::CoreError;
use testrun_lambda::adapters::dynamo::DynamoRunStore;
use testrun_lambda::adapters::s3::S3ObjectReader;
use testrun_lambda::adapters::sns::SnsNotifier;
use testrun_lambda::handlers::ingest::handle_report_object;
use testrun_lambda::logging::log_error;

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let locations = object_locations(&event.payload)?;

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(60))
                .operation_attempt_timeout(Duration::from_secs(20))
                .build(),
        )
        .load()
        .await;

    let table_name =
        std::env::var("TABLE").map_err(|_| Error::from("TABLE must be configured"))?;
    let store = DynamoRunStore::new(table_name, aws_sdk_dynamodb::Client::new(&aws_config));
    let reader = S3ObjectReader::new(aws_sdk_s3::Client::new(&aws_config));
    let notifier = SnsNotifier::new(aws_sdk_sns::Client::new(&aws_config));

    for (bucket, key) in locations {
        match handle_report_object(&bucket, &key, &reader, &store, &notifier, Utc::now()) {
            Ok(()) => {}
            // Malformed payloads are dropped here; the event source owns
            // dead-lettering and must not redeliver them.
            Err(CoreError::InvalidReport { message }) => {
                log_error(
                    "result_parser",
                    "report_dropped",
                    json!({"bucket": bucket, "key": key, "error": message}),
                );
            }
            // Everything else is retryable through event redelivery.
            Err(error) => {
                return Err(Error::from(format!("[{}] {error}", error.code())));
            }
        }
    }

    Ok(json!({"status": "ok"}))
}

fn object_locations(event: &Value) -> Result<Vec<(String, String)>, Error> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::from("storage event must include Records array"))?;

    let mut locations = Vec::with_capacity(records.len());
    for record in records {
        let bucket = record
            .get("s3")
            .and_then(|s3| s3.get("bucket"))
            .and_then(|bucket| bucket.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::from("storage record is missing the bucket name"))?;
        let key = record
            .get("s3")
            .and_then(|s3| s3.get("object"))
            .and_then(|object| object.get("key"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::from("storage record is missing the object key"))?;
        locations.push((bucket.to_string(), key.to_string()));
    }

    Ok(locations)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
