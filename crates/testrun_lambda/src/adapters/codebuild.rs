use aws_sdk_codebuild::types::{EnvironmentVariable, EnvironmentVariableType};
use testrun_core::params::EnvVariable;

use crate::adapters::job_trigger::JobTrigger;

pub struct CodeBuildJobTrigger {
    client: aws_sdk_codebuild::Client,
}

impl CodeBuildJobTrigger {
    pub fn new(client: aws_sdk_codebuild::Client) -> Self {
        Self { client }
    }
}

impl JobTrigger for CodeBuildJobTrigger {
    fn start_build(
        &self,
        project_name: &str,
        environment: &[EnvVariable],
    ) -> Result<String, String> {
        let mut overrides = Vec::with_capacity(environment.len());
        for variable in environment {
            let built = EnvironmentVariable::builder()
                .name(variable.name.clone())
                .value(variable.value.clone())
                .r#type(EnvironmentVariableType::Plaintext)
                .build()
                .map_err(|error| format!("invalid environment variable override: {error}"))?;
            overrides.push(built);
        }

        let client = self.client.clone();
        let project_name = project_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .start_build()
                    .project_name(project_name)
                    .set_environment_variables_override(Some(overrides))
                    .send()
                    .await
                    .map_err(|error| format!("failed to start build: {error}"))?;

                output
                    .build_value()
                    .and_then(|build| build.arn())
                    .map(str::to_string)
                    .ok_or_else(|| "build trigger returned no build arn".to_string())
            })
        })
    }
}
