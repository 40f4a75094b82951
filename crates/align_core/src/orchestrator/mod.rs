//! Pipeline orchestrator for alignment runs.
//!
//! A run is a sequence of steps that validate, execute against the host
//! timeline, and record their results in [`AlignState`]. A step with nothing
//! left to do halts the run; that is a normal outcome, not an error.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Collect    (active comp segments of both tracks)
//!     ├── Step: Detect     (onsets per track)
//!     ├── Step: Match      (pairs, threshold, grouping)
//!     ├── Step: Apply      (derived track, split/move edits)
//!     └── Step: Fill Gaps  (edge extension, crossfade overlap)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use align_core::orchestrator::{run_alignment, AlignRequest, Context};
//!
//! let request = AlignRequest::new(TrackRef(0), TrackRef(1), 15.0, 0.0);
//! let ctx = Context::new(request, "align_track2", logger);
//! let report = run_alignment(&ctx, &mut timeline)?;
//! println!("{:?}", report.outcome);
//! ```

mod errors;
mod pipeline;
mod report;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Halted, Pipeline, PipelineRunResult};
pub use report::{correction_stats, AlignReport, RunOutcome, StageCounts};
pub use step::PipelineStep;
pub use steps::{ApplyStep, CollectStep, DetectStep, GapFillStep, MatchStep};
pub use types::{
    AlignRequest, AlignState, CollectOutput, Context, EditOutput, MatchOutput, NothingToDo,
    OnsetOutput, ProgressCallback, Scope, StepOutcome,
};

use crate::timeline::TrackRepository;

/// Create the standard alignment pipeline.
///
/// 1. Collect - active comp segments of both tracks
/// 2. Detect - onsets on each track
/// 3. Match - nearest-onset pairs, threshold filter, grouping
/// 4. Apply - derived track and split/move edits
/// 5. Fill Gaps - close holes and leave crossfade overlap
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(CollectStep::new())
        .with_step(DetectStep::new())
        .with_step(MatchStep::new())
        .with_step(ApplyStep::new())
        .with_step(GapFillStep::new())
}

/// Validate the request, run the standard pipeline and summarize it.
pub fn run_alignment(ctx: &Context, repo: &mut dyn TrackRepository) -> PipelineResult<AlignReport> {
    if let Err(message) = ctx.request.validate() {
        ctx.logger.error(&message);
        return Err(PipelineError::validation_failed(&ctx.run_name, message));
    }

    ctx.logger.section("Align Track to Reference");

    let run_id = format!("{}-{}", ctx.run_name, chrono::Local::now().format("%Y%m%d-%H%M%S"));
    let mut state = AlignState::new(run_id);
    let run = create_standard_pipeline().run(ctx, repo, &mut state)?;

    let report = AlignReport::from_state(ctx, &state, &run);
    if report.is_completed() {
        ctx.logger.phase("Done");
        for line in report.summary_lines() {
            ctx.logger.success(&line);
        }
        ctx.logger.info("Original track is untouched");
    }
    tracing::info!("Run {} finished: {:?}", report.run_id, report.outcome);
    ctx.logger.flush();

    Ok(report)
}
