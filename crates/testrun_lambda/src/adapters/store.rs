use testrun_core::contract::{Marker, Project, TestEnv, TestRun};
use testrun_core::report::ReportOutcome;

/// Typed access to the single `(PK, SK)` table and its creation-time index.
/// Every coordination state this service relies on lives behind this seam.
pub trait RunStore {
    fn get_run(&self, run_id: &str) -> Result<Option<TestRun>, String>;

    fn put_run(&self, run: &TestRun) -> Result<(), String>;

    /// Blind conditional write of a canonical result onto the run identified
    /// by the exact key pair. Requires no prior read; fails when the record
    /// does not exist.
    fn apply_result(
        &self,
        pk: &str,
        sk: &str,
        outcome: &ReportOutcome,
        updated_at: &str,
    ) -> Result<(), String>;

    /// Most recent runs for a marker, newest-first, served by the
    /// creation-time index.
    fn latest_runs(&self, marker_id: &str, limit: usize) -> Result<Vec<TestRun>, String>;

    /// Full run history for a marker, newest-first.
    fn marker_history(&self, marker_id: &str) -> Result<Vec<TestRun>, String>;

    fn get_marker(&self, marker_id: &str) -> Result<Option<Marker>, String>;

    fn list_markers(&self) -> Result<Vec<Marker>, String>;

    fn get_project(&self, project_id: &str) -> Result<Option<Project>, String>;

    fn get_env(&self, env_id: &str) -> Result<Option<TestEnv>, String>;

    fn put_env(&self, env: &TestEnv) -> Result<(), String>;

    fn delete_env(&self, env_id: &str) -> Result<(), String>;

    fn list_envs(&self) -> Result<Vec<TestEnv>, String>;
}
