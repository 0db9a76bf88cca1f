//! In-memory fakes for the adapter seams, shared by handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use testrun_core::contract::{
    Marker, Parameter, Project, RunMetaData, RunStatus, TestEnv, TestRun,
};
use testrun_core::keys::{encode, EntityType};
use testrun_core::params::EnvVariable;
use testrun_core::report::ReportOutcome;

use crate::adapters::job_trigger::JobTrigger;
use crate::adapters::notifier::Notifier;
use crate::adapters::object_reader::ObjectReader;
use crate::adapters::store::RunStore;

#[derive(Default)]
struct StoreState {
    runs: Vec<TestRun>,
    markers: Vec<Marker>,
    projects: Vec<Project>,
    envs: Vec<TestEnv>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    pub fail_put_run: AtomicBool,
    pub fail_queries: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, project: Project) -> Self {
        self.state.lock().expect("poisoned mutex").projects.push(project);
        self
    }

    pub fn with_marker(self, marker: Marker) -> Self {
        self.state.lock().expect("poisoned mutex").markers.push(marker);
        self
    }

    pub fn with_env(self, env: TestEnv) -> Self {
        self.state.lock().expect("poisoned mutex").envs.push(env);
        self
    }

    pub fn with_run(self, run: TestRun) -> Self {
        self.state.lock().expect("poisoned mutex").runs.push(run);
        self
    }

    pub fn runs(&self) -> Vec<TestRun> {
        self.state.lock().expect("poisoned mutex").runs.clone()
    }

    pub fn envs(&self) -> Vec<TestEnv> {
        self.state.lock().expect("poisoned mutex").envs.clone()
    }

    fn check_query_failure(&self) -> Result<(), String> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err("simulated store outage".to_string());
        }
        Ok(())
    }
}

impl RunStore for InMemoryStore {
    fn get_run(&self, run_id: &str) -> Result<Option<TestRun>, String> {
        self.check_query_failure()?;
        let state = self.state.lock().expect("poisoned mutex");
        Ok(state.runs.iter().find(|run| run.id == run_id).cloned())
    }

    fn put_run(&self, run: &TestRun) -> Result<(), String> {
        if self.fail_put_run.load(Ordering::SeqCst) {
            return Err("simulated write failure".to_string());
        }
        let mut state = self.state.lock().expect("poisoned mutex");
        state.runs.retain(|existing| existing.id != run.id);
        state.runs.push(run.clone());
        Ok(())
    }

    fn apply_result(
        &self,
        pk: &str,
        sk: &str,
        outcome: &ReportOutcome,
        updated_at: &str,
    ) -> Result<(), String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        let target = state.runs.iter_mut().find(|run| {
            encode(EntityType::TestRun, &run.id) == pk
                && encode(EntityType::Marker, &run.marker_id) == sk
        });
        let Some(run) = target else {
            return Err(format!("conditional check failed for ({pk}, {sk})"));
        };

        run.status = outcome.status;
        run.passed = outcome.passed;
        run.failed = outcome.failed;
        run.total = outcome.total;
        run.duration = outcome.duration;
        run.updated_at = updated_at.to_string();
        run.result = outcome.results.clone();
        Ok(())
    }

    fn latest_runs(&self, marker_id: &str, limit: usize) -> Result<Vec<TestRun>, String> {
        let mut runs = self.marker_history(marker_id)?;
        runs.truncate(limit);
        Ok(runs)
    }

    fn marker_history(&self, marker_id: &str) -> Result<Vec<TestRun>, String> {
        self.check_query_failure()?;
        let state = self.state.lock().expect("poisoned mutex");
        let mut runs: Vec<TestRun> = state
            .runs
            .iter()
            .filter(|run| run.marker_id == marker_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    fn get_marker(&self, marker_id: &str) -> Result<Option<Marker>, String> {
        self.check_query_failure()?;
        let state = self.state.lock().expect("poisoned mutex");
        Ok(state
            .markers
            .iter()
            .find(|marker| marker.id == marker_id)
            .cloned())
    }

    fn list_markers(&self) -> Result<Vec<Marker>, String> {
        self.check_query_failure()?;
        Ok(self.state.lock().expect("poisoned mutex").markers.clone())
    }

    fn get_project(&self, project_id: &str) -> Result<Option<Project>, String> {
        self.check_query_failure()?;
        let state = self.state.lock().expect("poisoned mutex");
        Ok(state
            .projects
            .iter()
            .find(|project| project.id == project_id)
            .cloned())
    }

    fn get_env(&self, env_id: &str) -> Result<Option<TestEnv>, String> {
        self.check_query_failure()?;
        let state = self.state.lock().expect("poisoned mutex");
        Ok(state.envs.iter().find(|env| env.id == env_id).cloned())
    }

    fn put_env(&self, env: &TestEnv) -> Result<(), String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.envs.retain(|existing| existing.id != env.id);
        state.envs.push(env.clone());
        Ok(())
    }

    fn delete_env(&self, env_id: &str) -> Result<(), String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.envs.retain(|env| env.id != env_id);
        Ok(())
    }

    fn list_envs(&self) -> Result<Vec<TestEnv>, String> {
        self.check_query_failure()?;
        Ok(self.state.lock().expect("poisoned mutex").envs.clone())
    }
}

#[derive(Default)]
pub struct RecordingTrigger {
    pub builds: Mutex<Vec<(String, Vec<EnvVariable>)>>,
    pub fail: AtomicBool,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_count(&self) -> usize {
        self.builds.lock().expect("poisoned mutex").len()
    }
}

impl JobTrigger for RecordingTrigger {
    fn start_build(
        &self,
        project_name: &str,
        environment: &[EnvVariable],
    ) -> Result<String, String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("simulated trigger timeout".to_string());
        }
        let mut builds = self.builds.lock().expect("poisoned mutex");
        builds.push((project_name.to_string(), environment.to_vec()));
        Ok(format!(
            "arn:aws:codebuild:eu-west-1:123456789012:build/atp:{}",
            builds.len()
        ))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub topics: Mutex<Vec<String>>,
    pub subscriptions: Mutex<Vec<(String, String)>>,
    pub published: Mutex<Vec<(String, String, String)>>,
    pub fail_publish: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_messages(&self) -> Vec<(String, String, String)> {
        self.published.lock().expect("poisoned mutex").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn create_topic(&self, name: &str) -> Result<String, String> {
        self.topics
            .lock()
            .expect("poisoned mutex")
            .push(name.to_string());
        Ok(format!("arn:aws:sns:eu-west-1:123456789012:{name}"))
    }

    fn subscribe_email(&self, topic_arn: &str, email: &str) -> Result<(), String> {
        self.subscriptions
            .lock()
            .expect("poisoned mutex")
            .push((topic_arn.to_string(), email.to_string()));
        Ok(())
    }

    fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<(), String> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err("simulated publish failure".to_string());
        }
        self.published.lock().expect("poisoned mutex").push((
            topic_arn.to_string(),
            subject.to_string(),
            message.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticObjectReader {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl StaticObjectReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_object(&self, bucket: &str, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .insert(format!("{bucket}/{key}"), body.to_vec());
    }
}

impl ObjectReader for StaticObjectReader {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .get(&format!("{bucket}/{key}"))
            .cloned()
            .ok_or_else(|| format!("no such object: {bucket}/{key}"))
    }
}

pub fn sample_project() -> Project {
    Project {
        id: "proj-1".to_string(),
        name: "Ingestion Service".to_string(),
        repo_url: "https://git.example.com/ingestion-service".to_string(),
        branch: "main".to_string(),
        default_region: "eu-west-1".to_string(),
        project_type: "pytest".to_string(),
    }
}

pub fn sample_marker(id: &str) -> Marker {
    Marker {
        id: id.to_string(),
        name: format!("{id}-suite"),
        project_id: "proj-1".to_string(),
        model_name: "pipeline".to_string(),
    }
}

pub fn sample_env() -> TestEnv {
    TestEnv {
        id: "abcdef123456".to_string(),
        env_name: "staging".to_string(),
        region: "eu-central-1".to_string(),
        account_id: "123456789012".to_string(),
        stack_name: "atp-staging".to_string(),
        topic_arn: "arn:aws:sns:eu-central-1:123456789012:test-env-abcdef123456".to_string(),
        project_id: None,
        created_at: "2026-02-14T08:00:00Z".to_string(),
    }
}

pub fn sample_run(id: &str, marker_id: &str, status: RunStatus, created_at: &str) -> TestRun {
    TestRun {
        id: id.to_string(),
        marker_id: marker_id.to_string(),
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
        status,
        duration: 0,
        parameters: vec![Parameter {
            parameter_key: "version".to_string(),
            parameter_value: "2.1.0".to_string(),
        }],
        test_env_id: Some("abcdef123456".to_string()),
        code_build_arn: "arn:aws:codebuild:eu-west-1:123456789012:build/atp:1".to_string(),
        meta_data: RunMetaData {
            account_id: "123456789012".to_string(),
            region: "eu-central-1".to_string(),
            stack_name: "atp-staging".to_string(),
        },
        result: Vec::new(),
        passed: 0,
        failed: 0,
        total: 0,
    }
}
