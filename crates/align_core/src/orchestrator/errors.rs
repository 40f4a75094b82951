//! Error types for the alignment pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Host operation → Detail
//!
//! "Nothing to do" outcomes (no segments, no onsets, nothing above the
//! threshold) are not errors; see [`super::NothingToDo`].

use thiserror::Error;

use crate::timeline::TimelineError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{run_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        run_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The request was rejected before any step ran.
    #[error("Run '{run_name}' failed validation: {message}")]
    ValidationFailed { run_name: String, message: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        run_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            run_name: run_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a validation failed error.
    pub fn validation_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// The host timeline rejected an operation the run cannot do without.
    #[error("Host operation '{operation}' failed: {source}")]
    Host {
        operation: String,
        #[source]
        source: TimelineError,
    },

    /// A previous step did not record what this step needs.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create a host error with context.
    pub fn host(operation: impl Into<String>, source: TimelineError) -> Self {
        Self::Host {
            operation: operation.into(),
            source,
        }
    }

    /// Create a precondition failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackRef;

    #[test]
    fn host_error_displays_context() {
        let err = StepError::host("create derived track", TimelineError::UnknownTrack(TrackRef(4)));
        let msg = err.to_string();
        assert!(msg.contains("create derived track"));
        assert!(msg.contains("Track 5 not found"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::precondition_failed("no onsets recorded");
        let pipeline_err = PipelineError::step_failed("align_track2", "Match", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("align_track2"));
        assert!(msg.contains("Match"));
        assert!(msg.contains("no onsets recorded"));
    }
}
