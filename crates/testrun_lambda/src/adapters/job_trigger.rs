use testrun_core::params::EnvVariable;

pub trait JobTrigger {
    /// Requests one execution of the external build job with the merged
    /// environment set. Returns an opaque job handle.
    fn start_build(
        &self,
        project_name: &str,
        environment: &[EnvVariable],
    ) -> Result<String, String>;
}
