//! Pipeline runner that executes steps in sequence.

use crate::timeline::TrackRepository;

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{AlignState, Context, NothingToDo, StepOutcome};

/// Pipeline that runs a sequence of steps.
///
/// The pipeline executes steps in order, running validation before
/// and after each step. The first step that halts ends the run.
pub struct Pipeline {
    /// Steps to execute in order.
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run the pipeline against a host timeline.
    ///
    /// Executes each step in order:
    /// 1. Run `validate_input`
    /// 2. Run `execute`
    /// 3. Run `validate_output` (if execute returned Continue)
    ///
    /// A halt is a successful run that stopped early.
    pub fn run(
        &self,
        ctx: &Context,
        repo: &mut dyn TrackRepository,
        state: &mut AlignState,
    ) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();
        let total_steps = self.steps.len().max(1);

        for (i, step) in self.steps.iter().enumerate() {
            let step_name = step.name();
            ctx.logger.phase(step.description());

            let percent = ((i as f64 / total_steps as f64) * 100.0) as u32;
            ctx.report_progress(step_name, percent, &format!("Starting {}", step_name));

            ctx.logger.debug(&format!("Validating input for '{}'", step_name));
            if let Err(e) = step.validate_input(ctx, state) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(PipelineError::step_failed(&ctx.run_name, step_name, e));
            }

            ctx.logger.debug(&format!("Executing '{}'", step_name));
            let outcome = step.execute(ctx, repo, state).map_err(|e| {
                ctx.logger.error(&format!("Execution failed: {}", e));
                PipelineError::step_failed(&ctx.run_name, step_name, e)
            })?;

            match outcome {
                StepOutcome::Continue => {
                    ctx.logger
                        .debug(&format!("Validating output for '{}'", step_name));
                    if let Err(e) = step.validate_output(ctx, state) {
                        ctx.logger.error(&format!("Output validation failed: {}", e));
                        return Err(PipelineError::step_failed(&ctx.run_name, step_name, e));
                    }
                    result.steps_completed.push(step_name.to_string());
                }
                StepOutcome::Halt(reason) => {
                    ctx.logger.warn(&format!("Nothing to do: {}", reason));
                    tracing::info!("Run '{}' halted at '{}': {}", ctx.run_name, step_name, reason);
                    result.halted = Some(Halted {
                        step: step_name.to_string(),
                        reason,
                    });
                    ctx.report_progress(step_name, 100, "Nothing to do");
                    return Ok(result);
                }
            }
        }

        ctx.report_progress("Complete", 100, "Pipeline finished");
        Ok(result)
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Where and why a run stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct Halted {
    pub step: String,
    pub reason: NothingToDo,
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    /// Steps that completed and passed output validation.
    pub steps_completed: Vec<String>,
    /// Set when a step halted the run.
    pub halted: Option<Halted>,
}

impl PipelineRunResult {
    /// Check if every step ran.
    pub fn all_completed(&self) -> bool {
        self.halted.is_none()
    }
}
