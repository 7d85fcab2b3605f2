//! Error taxonomy for stage execution.
//!
//! Every stage turns its failures into exactly one [`PipelineError`] and hands it
//! to the pipeline as [`StepResult::Error`](crate::stage::StepResult::Error).
//! Each variant records the stage that failed and the request it failed on, and
//! maps to a transport status through [`PipelineError::status`].

use crate::registry::StageId;
use http::StatusCode;
use thiserror::Error;

/// Boxed source error, the same shape user computations are erased into.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A `requires` field is absent or null in the merged view.
    #[error("Stage '{stage}' dependency '{field}' not met on '{method} {url}'")]
    DependencyUnmet {
        stage: String,
        field: String,
        url: String,
        method: String,
    },

    /// A `depends_on` computation has not run for this request.
    #[error(
        "Stage '{stage}' expects '{dependency}' to be executed before it can be executed for '{method} {url}'"
    )]
    DependsOnUnmet {
        stage: String,
        dependency: StageId,
        url: String,
        method: String,
    },

    #[error("Validation error: '{stage}' on '{method} {url}'. {message}")]
    ValidationFailed {
        stage: String,
        url: String,
        method: String,
        message: String,
    },

    /// The user computation itself failed.
    #[error("Stage '{stage}' failed on '{method} {url}': {source}")]
    Computation {
        stage: String,
        url: String,
        method: String,
        status: u16,
        #[source]
        source: BoxError,
    },

    /// The computation succeeded but its output cannot be stored or written.
    #[error("Stage '{stage}' produced unusable output on '{method} {url}': {reason}")]
    InvalidOutput {
        stage: String,
        url: String,
        method: String,
        reason: String,
    },
}

impl PipelineError {
    /// Wraps a failed user computation, keeping the status of a [`Rejection`]
    /// anywhere in the error chain and defaulting to 500.
    pub fn computation(stage: &str, url: &str, method: &str, err: anyhow::Error) -> Self {
        let status = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<Rejection>())
            .map(|rejection| error_status(rejection.status))
            .unwrap_or(500);

        PipelineError::Computation {
            stage: stage.to_string(),
            url: url.to_string(),
            method: method.to_string(),
            status,
            source: err.into(),
        }
    }

    /// Numeric severity: 400 for client-caused failures, 500 for wiring and
    /// server faults, or whatever a [`Rejection`] carried.
    pub fn status(&self) -> u16 {
        match self {
            PipelineError::DependencyUnmet { .. } => 400,
            PipelineError::DependsOnUnmet { .. } => 500,
            PipelineError::ValidationFailed { .. } => 400,
            PipelineError::Computation { status, .. } => *status,
            PipelineError::InvalidOutput { .. } => 500,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::DependencyUnmet { .. } => "dependency_unmet",
            PipelineError::DependsOnUnmet { .. } => "depends_on_unmet",
            PipelineError::ValidationFailed { .. } => "validation_failed",
            PipelineError::Computation { .. } => "computation_failed",
            PipelineError::InvalidOutput { .. } => "invalid_output",
        }
    }

    pub fn stage(&self) -> &str {
        match self {
            PipelineError::DependencyUnmet { stage, .. }
            | PipelineError::DependsOnUnmet { stage, .. }
            | PipelineError::ValidationFailed { stage, .. }
            | PipelineError::Computation { stage, .. }
            | PipelineError::InvalidOutput { stage, .. } => stage,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            PipelineError::DependencyUnmet { url, .. }
            | PipelineError::DependsOnUnmet { url, .. }
            | PipelineError::ValidationFailed { url, .. }
            | PipelineError::Computation { url, .. }
            | PipelineError::InvalidOutput { url, .. } => url,
        }
    }

    pub fn method(&self) -> &str {
        match self {
            PipelineError::DependencyUnmet { method, .. }
            | PipelineError::DependsOnUnmet { method, .. }
            | PipelineError::ValidationFailed { method, .. }
            | PipelineError::Computation { method, .. }
            | PipelineError::InvalidOutput { method, .. } => method,
        }
    }
}

/// An error a computation can return to choose the transport status of its
/// failure, e.g. `Err(Rejection::new(404, "no such user").into())`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Rejection {
    pub status: u16,
    pub message: String,
}

impl Rejection {
    /// Statuses outside `400..=599` become 500.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: error_status(status),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }
}

fn error_status(status: u16) -> u16 {
    if (400..=599).contains(&status) {
        status
    } else {
        500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_kind() {
        let unmet = PipelineError::DependencyUnmet {
            stage: "load".into(),
            field: "userId".into(),
            url: "/users".into(),
            method: "GET".into(),
        };
        assert_eq!(unmet.status(), 400);
        assert!(unmet.is_client_error());
        assert_eq!(
            unmet.to_string(),
            "Stage 'load' dependency 'userId' not met on 'GET /users'"
        );

        let wiring = PipelineError::DependsOnUnmet {
            stage: "load".into(),
            dependency: StageId::from_raw(7),
            url: "/users".into(),
            method: "GET".into(),
        };
        assert_eq!(wiring.status(), 500);
        assert_eq!(wiring.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(wiring.kind(), "depends_on_unmet");
    }

    #[test]
    fn test_computation_status_from_rejection() {
        let err = anyhow::Error::new(Rejection::not_found("no such user"));
        let wrapped = PipelineError::computation("load", "/users/9", "GET", err);
        assert_eq!(wrapped.status(), 404);
        assert_eq!(wrapped.stage(), "load");

        let plain = PipelineError::computation("load", "/", "GET", anyhow::anyhow!("db down"));
        assert_eq!(plain.status(), 500);
        assert!(plain.to_string().contains("db down"));
    }

    #[test]
    fn test_rejection_found_through_context() {
        let err = anyhow::Error::new(Rejection::bad_request("bad id")).context("loading user");
        let wrapped = PipelineError::computation("load", "/", "POST", err);
        assert_eq!(wrapped.status(), 400);
    }

    #[test]
    fn test_out_of_range_status_is_server_error() {
        let odd = Rejection::new(42, "not a status");
        assert_eq!(odd.status, 500);
        assert_eq!(Rejection::new(200, "success is not a failure").status, 500);
        assert_eq!(Rejection::new(503, "busy").status, 503);

        let forged = Rejection {
            status: 42,
            message: "built by hand".into(),
        };
        let wrapped = PipelineError::computation("load", "/", "GET", anyhow::Error::new(forged));
        assert_eq!(wrapped.status(), 500);
        assert_eq!(wrapped.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!wrapped.is_client_error());
    }
}
