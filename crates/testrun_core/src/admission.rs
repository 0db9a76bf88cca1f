use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::contract::{parse_timestamp, RunStatus, TestRun};

pub const DEFAULT_EXCLUSION_WINDOW_MINUTES: i64 = 30;

/// Bound on how many recent runs are fetched per group member. Anything
/// older than the newest few cannot still be inside the exclusion window
/// unless the window is configured absurdly large.
pub const RECENT_RUN_FETCH_LIMIT: usize = 5;

/// Static mapping from a marker to the set of markers that must not run
/// concurrently with it. Membership is directional: only the requested
/// marker's own group is consulted, so cross-blocking between two markers
/// exists exactly when both configure each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPolicy {
    groups: BTreeMap<String, Vec<String>>,
    window: Duration,
}

#[derive(Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    window_minutes: Option<i64>,
}

impl ExclusionPolicy {
    pub fn new(window: Duration) -> Self {
        Self {
            groups: BTreeMap::new(),
            window,
        }
    }

    pub fn with_group(mut self, marker_id: impl Into<String>, members: Vec<String>) -> Self {
        self.groups.insert(marker_id.into(), members);
        self
    }

    /// Loads a policy from its JSON document form, e.g.
    /// `{"groups": {"nightly-a": ["nightly-a", "nightly-b"]}, "window_minutes": 30}`.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let document: PolicyDocument = serde_json::from_str(raw)
            .map_err(|error| format!("malformed exclusion policy document: {error}"))?;
        let minutes = document
            .window_minutes
            .unwrap_or(DEFAULT_EXCLUSION_WINDOW_MINUTES);
        if minutes <= 0 {
            return Err("exclusion window must be a positive number of minutes".to_string());
        }
        Ok(Self {
            groups: document.groups,
            window: Duration::minutes(minutes),
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Markers without a configured group have no exclusivity relationships.
    pub fn group_for(&self, marker_id: &str) -> &[String] {
        self.groups
            .get(marker_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_EXCLUSION_WINDOW_MINUTES))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Deny { reason: String },
}

/// Decides whether a new run for `marker_id` may start at `now`.
///
/// `fetch_latest` yields a marker's most recent runs newest-first, bounded
/// by the requested limit; the store's creation-time index serves this
/// without a scan. A `RUNNING` run younger than the window denies
/// admission. A run whose timestamp does not parse is stale and never
/// blocks.
///
/// The read-decide-write sequence is not protected by any cross-request
/// lock; two concurrent launches can both observe a clear window. Accepted
/// as a best-effort guard.
pub fn decide<F>(
    policy: &ExclusionPolicy,
    marker_id: &str,
    now: DateTime<Utc>,
    mut fetch_latest: F,
) -> Result<Admission, String>
where
    F: FnMut(&str, usize) -> Result<Vec<TestRun>, String>,
{
    for member in policy.group_for(marker_id) {
        let recent = fetch_latest(member, RECENT_RUN_FETCH_LIMIT)?;
        for run in recent {
            if run.status != RunStatus::Running {
                continue;
            }
            let Some(created_at) = parse_timestamp(&run.created_at) else {
                continue;
            };
            if now.signed_duration_since(created_at) < policy.window() {
                return Ok(Admission::Deny {
                    reason: format!(
                        "marker '{member}' has run '{}' active inside the {}-minute exclusion window",
                        run.id,
                        policy.window().num_minutes(),
                    ),
                });
            }
        }
    }

    Ok(Admission::Admit)
}
