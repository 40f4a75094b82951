//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use crate::timeline::TrackRepository;

use super::errors::StepResult;
use super::types::{AlignState, Context, StepOutcome};

/// Trait for pipeline steps.
///
/// Each step in the pipeline implements this trait. The pipeline runner
/// calls these methods in order:
///
/// 1. `validate_input` - Check that earlier steps recorded what this one needs
/// 2. `execute` - Perform the step's work against the host timeline
/// 3. `validate_output` - Verify the step recorded its output
///
/// `validate_output` is skipped when `execute` halts the run.
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &Context, state: &AlignState) -> StepResult<()>;

    /// Execute the step's main work.
    ///
    /// Records results in `state`. Returns `StepOutcome::Halt` when there is
    /// nothing left to do; that ends the run without an error.
    fn execute(
        &self,
        ctx: &Context,
        repo: &mut dyn TrackRepository,
        state: &mut AlignState,
    ) -> StepResult<StepOutcome>;

    /// Validate outputs after execution.
    fn validate_output(&self, ctx: &Context, state: &AlignState) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
