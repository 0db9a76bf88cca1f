use std::collections::BTreeMap;

use serde::Serialize;
use testrun_core::contract::{CheckPointStatus, TestRun};
use testrun_core::error::CoreError;
use testrun_core::pagination::paginate;

use crate::adapters::store::RunStore;

/// Latest-known run status summarized per marker.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckPoint {
    pub id: String,
    pub name: String,
    pub project_name: String,
    pub model_name: String,
    pub status: CheckPointStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tested_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckPointPage {
    pub total: usize,
    pub check_points: Vec<CheckPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub total: usize,
    pub test_histories: Vec<TestRun>,
}

/// One checkpoint per marker, sorted by marker id. The per-marker status is
/// the newest run served by the creation-time index, `UNKNOWN` when the
/// marker has never run. Tolerates a slightly stale index.
pub fn list_check_points(
    store: &dyn RunStore,
    page: usize,
    count: usize,
) -> Result<CheckPointPage, CoreError> {
    let mut markers = store.list_markers().map_err(CoreError::upstream)?;
    markers.sort_by(|a, b| a.id.cmp(&b.id));

    let mut project_names: BTreeMap<String, String> = BTreeMap::new();
    let mut check_points = Vec::with_capacity(markers.len());
    for marker in markers {
        let latest = store
            .latest_runs(&marker.id, 1)
            .map_err(CoreError::upstream)?;
        let latest_run = latest.first();

        let project_name = match project_names.get(&marker.project_id) {
            Some(name) => name.clone(),
            None => {
                let name = store
                    .get_project(&marker.project_id)
                    .map_err(CoreError::upstream)?
                    .map(|project| project.name)
                    .unwrap_or_default();
                project_names.insert(marker.project_id.clone(), name.clone());
                name
            }
        };

        check_points.push(CheckPoint {
            id: marker.id,
            name: marker.name,
            project_name,
            model_name: marker.model_name,
            status: CheckPointStatus::from(latest_run.map(|run| run.status)),
            last_tested_at: latest_run.map(|run| run.created_at.clone()),
        });
    }

    let (total, page_items) = paginate(&check_points, page, count);
    Ok(CheckPointPage {
        total,
        check_points: page_items,
    })
}

pub fn list_history(
    store: &dyn RunStore,
    marker_id: &str,
    page: usize,
    count: usize,
) -> Result<HistoryPage, CoreError> {
    let runs = store.marker_history(marker_id).map_err(CoreError::upstream)?;
    let (total, test_histories) = paginate(&runs, page, count);
    Ok(HistoryPage {
        total,
        test_histories,
    })
}

pub fn get_run(store: &dyn RunStore, run_id: &str) -> Result<TestRun, CoreError> {
    store
        .get_run(run_id)
        .map_err(CoreError::upstream)?
        .ok_or_else(|| CoreError::RunNotFound {
            run_id: run_id.to_string(),
        })
}
