use serde::Serialize;

use crate::contract::{Marker, Parameter, Project, TestEnv};
use crate::error::CoreError;

/// One environment variable handed to the external build job.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnvVariable {
    pub name: String,
    pub value: String,
}

/// Caller parameter keys translated into the variable names the pytest
/// buildspec consumes.
const PYTEST_PARAMETER_MAPPING: &[(&str, &str)] = &[
    ("version", "SOLUTION_VERSION"),
    ("endpoint", "TARGET_ENDPOINT"),
    ("logLevel", "LOG_LEVEL"),
];

const BEHAVE_PARAMETER_MAPPING: &[(&str, &str)] = &[
    ("version", "SOLUTION_VERSION"),
    ("tags", "BEHAVE_TAGS"),
];

fn mapping_for(project_type: &str) -> Result<&'static [(&'static str, &'static str)], CoreError> {
    match project_type {
        "pytest" => Ok(PYTEST_PARAMETER_MAPPING),
        "behave" => Ok(BEHAVE_PARAMETER_MAPPING),
        other => Err(CoreError::UnsupportedProject {
            project_type: other.to_string(),
        }),
    }
}

/// Builds the deterministic environment set for a launch: the static
/// project/marker/env variables first, then the caller's parameters mapped
/// through the project-type table. Unmapped keys pass through verbatim.
/// Pure and total for a known project type.
pub fn build_environment(
    project: &Project,
    marker: &Marker,
    test_env: Option<&TestEnv>,
    parameters: &[Parameter],
) -> Result<Vec<EnvVariable>, CoreError> {
    let mapping = mapping_for(&project.project_type)?;

    let region = test_env
        .map(|env| env.region.as_str())
        .unwrap_or(project.default_region.as_str());

    let mut environment = vec![
        EnvVariable {
            name: "TEST_MARKER".to_string(),
            value: marker.name.clone(),
        },
        EnvVariable {
            name: "PROJECT_REPO".to_string(),
            value: project.repo_url.clone(),
        },
        EnvVariable {
            name: "PROJECT_BRANCH".to_string(),
            value: project.branch.clone(),
        },
        EnvVariable {
            name: "TEST_REGION".to_string(),
            value: region.to_string(),
        },
    ];
    if let Some(env) = test_env {
        environment.push(EnvVariable {
            name: "TEST_ENV_ID".to_string(),
            value: env.id.clone(),
        });
        environment.push(EnvVariable {
            name: "STACK_NAME".to_string(),
            value: env.stack_name.clone(),
        });
    }

    for parameter in parameters {
        let name = mapping
            .iter()
            .find(|(key, _)| *key == parameter.parameter_key)
            .map(|(_, variable)| (*variable).to_string())
            .unwrap_or_else(|| parameter.parameter_key.clone());
        upsert(&mut environment, name, parameter.parameter_value.clone());
    }

    Ok(environment)
}

fn upsert(environment: &mut Vec<EnvVariable>, name: String, value: String) {
    match environment.iter_mut().find(|variable| variable.name == name) {
        Some(existing) => existing.value = value,
        None => environment.push(EnvVariable { name, value }),
    }
}
