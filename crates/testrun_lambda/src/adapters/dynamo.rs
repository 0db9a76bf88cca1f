use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Value};
use testrun_core::contract::{Marker, Project, TestEnv, TestRun};
use testrun_core::keys::{encode, EntityType};
use testrun_core::report::ReportOutcome;

use crate::adapters::store::RunStore;

/// Secondary index keyed by SK and ordered by creation timestamp. Serves
/// "latest runs for marker X" newest-first without a scan.
pub const CREATED_AT_INDEX: &str = "createdAtIndex";

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoRunStore {
    table_name: String,
    client: aws_sdk_dynamodb::Client,
}

impl DynamoRunStore {
    pub fn new(table_name: impl Into<String>, client: aws_sdk_dynamodb::Client) -> Self {
        Self {
            table_name: table_name.into(),
            client,
        }
    }

    fn block_on<F, T>(&self, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }

    fn first_item_by_pk(&self, pk: &str) -> Result<Option<Item>, String> {
        let client = self.client.clone();
        let table_name = self.table_name.clone();
        let pk = pk.to_string();

        self.block_on(async move {
            let output = client
                .query()
                .table_name(table_name)
                .key_condition_expression("PK = :pk")
                .expression_attribute_values(":pk", AttributeValue::S(pk))
                .limit(1)
                .send()
                .await
                .map_err(|error| format!("failed to query table by partition key: {error}"))?;

            Ok(output.items().first().cloned())
        })
    }

    fn put_document(&self, pk: &str, sk: &str, document: &Value) -> Result<(), String> {
        let mut item = encode_document(document)?;
        item.insert("PK".to_string(), AttributeValue::S(pk.to_string()));
        item.insert("SK".to_string(), AttributeValue::S(sk.to_string()));

        let client = self.client.clone();
        let table_name = self.table_name.clone();

        self.block_on(async move {
            client
                .put_item()
                .table_name(table_name)
                .set_item(Some(item))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to put item: {error}"))
        })
    }

    fn query_runs(&self, marker_id: &str, limit: Option<usize>) -> Result<Vec<TestRun>, String> {
        let client = self.client.clone();
        let table_name = self.table_name.clone();
        let sk = encode(EntityType::Marker, marker_id);

        self.block_on(async move {
            let mut runs = Vec::new();
            let mut exclusive_start_key: Option<Item> = None;

            loop {
                let mut request = client
                    .query()
                    .table_name(table_name.clone())
                    .index_name(CREATED_AT_INDEX)
                    .key_condition_expression("SK = :sk")
                    .expression_attribute_values(":sk", AttributeValue::S(sk.clone()))
                    .scan_index_forward(false)
                    .set_exclusive_start_key(exclusive_start_key.take());
                if let Some(limit) = limit {
                    request = request.limit(limit as i32);
                }

                let output = request
                    .send()
                    .await
                    .map_err(|error| format!("failed to query creation-time index: {error}"))?;

                for item in output.items() {
                    runs.push(decode_item::<TestRun>(item)?);
                    if limit.is_some_and(|limit| runs.len() >= limit) {
                        return Ok(runs);
                    }
                }

                match output.last_evaluated_key() {
                    Some(key) if limit.is_none() => exclusive_start_key = Some(key.clone()),
                    _ => return Ok(runs),
                }
            }
        })
    }

    fn scan_by_prefix<T: serde::de::DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<T>, String> {
        let client = self.client.clone();
        let table_name = self.table_name.clone();
        let prefix = prefix.to_string();

        self.block_on(async move {
            let mut records = Vec::new();
            let mut exclusive_start_key: Option<Item> = None;

            loop {
                let output = client
                    .scan()
                    .table_name(table_name.clone())
                    .filter_expression("begins_with(PK, :prefix)")
                    .expression_attribute_values(":prefix", AttributeValue::S(prefix.clone()))
                    .set_exclusive_start_key(exclusive_start_key.take())
                    .send()
                    .await
                    .map_err(|error| format!("failed to scan table: {error}"))?;

                for item in output.items() {
                    records.push(decode_item::<T>(item)?);
                }

                match output.last_evaluated_key() {
                    Some(key) => exclusive_start_key = Some(key.clone()),
                    None => return Ok(records),
                }
            }
        })
    }
}

impl RunStore for DynamoRunStore {
    fn get_run(&self, run_id: &str) -> Result<Option<TestRun>, String> {
        let item = self.first_item_by_pk(&encode(EntityType::TestRun, run_id))?;
        item.as_ref().map(decode_item::<TestRun>).transpose()
    }

    fn put_run(&self, run: &TestRun) -> Result<(), String> {
        let document = serde_json::to_value(run)
            .map_err(|error| format!("failed to serialize run record: {error}"))?;
        self.put_document(
            &encode(EntityType::TestRun, &run.id),
            &encode(EntityType::Marker, &run.marker_id),
            &document,
        )
    }

    fn apply_result(
        &self,
        pk: &str,
        sk: &str,
        outcome: &ReportOutcome,
        updated_at: &str,
    ) -> Result<(), String> {
        let results = serde_json::to_value(&outcome.results)
            .map_err(|error| format!("failed to serialize result list: {error}"))?;

        let client = self.client.clone();
        let table_name = self.table_name.clone();
        let pk = pk.to_string();
        let sk = sk.to_string();
        let status = outcome.status;
        let passed = outcome.passed;
        let failed = outcome.failed;
        let total = outcome.total;
        let duration = outcome.duration;
        let updated_at = updated_at.to_string();

        self.block_on(async move {
            client
                .update_item()
                .table_name(table_name)
                .key("PK", AttributeValue::S(pk))
                .key("SK", AttributeValue::S(sk))
                .update_expression(
                    "SET #status = :status, #passed = :passed, #failed = :failed, \
                     #total = :total, #duration = :duration, #updated_at = :updated_at, \
                     #result = :result",
                )
                .condition_expression("attribute_exists(PK)")
                .expression_attribute_names("#status", "status")
                .expression_attribute_names("#passed", "passed")
                .expression_attribute_names("#failed", "failed")
                .expression_attribute_names("#total", "total")
                .expression_attribute_names("#duration", "duration")
                .expression_attribute_names("#updated_at", "updatedAt")
                .expression_attribute_names("#result", "result")
                .expression_attribute_values(":status", AttributeValue::S(status.as_str().to_string()))
                .expression_attribute_values(":passed", AttributeValue::N(passed.to_string()))
                .expression_attribute_values(":failed", AttributeValue::N(failed.to_string()))
                .expression_attribute_values(":total", AttributeValue::N(total.to_string()))
                .expression_attribute_values(":duration", AttributeValue::N(duration.to_string()))
                .expression_attribute_values(":updated_at", AttributeValue::S(updated_at))
                .expression_attribute_values(":result", to_attribute(&results))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to apply result update: {error}"))
        })
    }

    fn latest_runs(&self, marker_id: &str, limit: usize) -> Result<Vec<TestRun>, String> {
        self.query_runs(marker_id, Some(limit))
    }

    fn marker_history(&self, marker_id: &str) -> Result<Vec<TestRun>, String> {
        self.query_runs(marker_id, None)
    }

    fn get_marker(&self, marker_id: &str) -> Result<Option<Marker>, String> {
        let item = self.first_item_by_pk(&encode(EntityType::Marker, marker_id))?;
        item.as_ref().map(decode_item::<Marker>).transpose()
    }

    fn list_markers(&self) -> Result<Vec<Marker>, String> {
        self.scan_by_prefix(&encode(EntityType::Marker, ""))
    }

    fn get_project(&self, project_id: &str) -> Result<Option<Project>, String> {
        let item = self.first_item_by_pk(&encode(EntityType::Project, project_id))?;
        item.as_ref().map(decode_item::<Project>).transpose()
    }

    fn get_env(&self, env_id: &str) -> Result<Option<TestEnv>, String> {
        let item = self.first_item_by_pk(&encode(EntityType::TestEnv, env_id))?;
        item.as_ref().map(decode_item::<TestEnv>).transpose()
    }

    fn put_env(&self, env: &TestEnv) -> Result<(), String> {
        let document = serde_json::to_value(env)
            .map_err(|error| format!("failed to serialize environment record: {error}"))?;
        let key = encode(EntityType::TestEnv, &env.id);
        self.put_document(&key, &key, &document)
    }

    fn delete_env(&self, env_id: &str) -> Result<(), String> {
        let key = encode(EntityType::TestEnv, env_id);
        let client = self.client.clone();
        let table_name = self.table_name.clone();

        self.block_on(async move {
            client
                .delete_item()
                .table_name(table_name)
                .key("PK", AttributeValue::S(key.clone()))
                .key("SK", AttributeValue::S(key))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to delete environment: {error}"))
        })
    }

    fn list_envs(&self) -> Result<Vec<TestEnv>, String> {
        self.scan_by_prefix(&encode(EntityType::TestEnv, ""))
    }
}

fn encode_document(document: &Value) -> Result<Item, String> {
    let Value::Object(map) = document else {
        return Err("expected a JSON object for item encoding".to_string());
    };

    Ok(map
        .iter()
        .map(|(name, value)| (name.clone(), to_attribute(value)))
        .collect())
}

fn decode_item<T: serde::de::DeserializeOwned>(item: &Item) -> Result<T, String> {
    let mut map = Map::new();
    for (name, attribute) in item {
        map.insert(name.clone(), from_attribute(attribute));
    }

    serde_json::from_value(Value::Object(map))
        .map_err(|error| format!("malformed item in table: {error}"))
}

fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(name, nested)| (name.clone(), to_attribute(nested)))
                .collect(),
        ),
    }
}

fn from_attribute(attribute: &AttributeValue) -> Value {
    match attribute {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(raw) => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(raw.clone())),
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(name, nested)| (name.clone(), from_attribute(nested)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn attribute_conversion_round_trips_nested_documents() {
        let document = json!({
            "id": "run-1",
            "duration": 42,
            "ratio": 0.5,
            "passed": true,
            "result": [{"message": "N/A", "trace": "N/A"}],
            "metaData": {"accountId": "123456789012"},
        });

        let encoded = encode_document(&document).expect("document should encode");
        let mut map = Map::new();
        for (name, attribute) in &encoded {
            map.insert(name.clone(), from_attribute(attribute));
        }

        assert_eq!(Value::Object(map), document);
    }

    #[test]
    fn non_object_documents_are_rejected() {
        let error = encode_document(&json!(["not", "an", "object"]))
            .expect_err("arrays should not encode as items");
        assert!(error.contains("JSON object"));
    }
}
