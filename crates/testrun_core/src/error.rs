use std::fmt;

/// Typed failure surface for every orchestration operation. Malformed input
/// never panics; it degrades to one of these variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A conflicting run is active inside the exclusion window. Recoverable;
    /// the caller retries later.
    RunDenied { reason: String },
    /// The requested marker, or its owning project, does not exist.
    MarkerNotFound { marker_id: String },
    /// The requested target environment does not exist.
    EnvironmentNotFound { env_id: String },
    /// No run record exists for the requested id.
    RunNotFound { run_id: String },
    /// The marker's project declares a type with no parameter mapping.
    UnsupportedProject { project_type: String },
    /// The ingestion payload is malformed. Dropped and logged; redelivery is
    /// the event source's concern.
    InvalidReport { message: String },
    /// A store or external-service call failed.
    UpstreamUnavailable { message: String },
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::RunDenied { .. } => "RUN_DENIED",
            Self::MarkerNotFound { .. } => "MARKER_NOT_FOUND",
            Self::EnvironmentNotFound { .. } => "ENVIRONMENT_NOT_FOUND",
            Self::RunNotFound { .. } => "RUN_NOT_FOUND",
            Self::UnsupportedProject { .. } => "UNSUPPORTED_PROJECT",
            Self::InvalidReport { .. } => "INVALID_REPORT",
            Self::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    pub fn invalid_report(message: impl Into<String>) -> Self {
        Self::InvalidReport {
            message: message.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunDenied { reason } => write!(f, "run denied: {reason}"),
            Self::MarkerNotFound { marker_id } => write!(f, "marker '{marker_id}' not found"),
            Self::EnvironmentNotFound { env_id } => {
                write!(f, "test environment '{env_id}' not found")
            }
            Self::RunNotFound { run_id } => write!(f, "test run '{run_id}' not found"),
            Self::UnsupportedProject { project_type } => {
                write!(f, "no parameter mapping for project type '{project_type}'")
            }
            Self::InvalidReport { message } => write!(f, "invalid test report: {message}"),
            Self::UpstreamUnavailable { message } => write!(f, "upstream call failed: {message}"),
        }
    }
}

impl std::error::Error for CoreError {}
