//! Detect step - finds onsets on the collected segments of both tracks.
//!
//! Segment files are resolved through the host before reading, so relative
//! paths in a project document work. A segment that cannot be decoded
//! contributes no onsets.

use crate::analysis::OnsetDetector;
use crate::models::Segment;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AlignState, Context, NothingToDo, OnsetOutput, StepOutcome};
use crate::timeline::TrackRepository;

/// Detect step for onset detection.
pub struct DetectStep;

impl DetectStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DetectStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for DetectStep {
    fn name(&self) -> &str {
        "Detect"
    }

    fn description(&self) -> &str {
        "Detect onsets"
    }

    fn validate_input(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        if state.collected.is_none() {
            return Err(StepError::precondition_failed("No segments collected"));
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &Context,
        repo: &mut dyn TrackRepository,
        state: &mut AlignState,
    ) -> StepResult<StepOutcome> {
        let collected = state
            .collected
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("No segments collected"))?;

        ctx.logger.info(&format!(
            "Sensitivity: {:.1}, minimum gap: {:.0}ms",
            ctx.params.onset_threshold_factor,
            ctx.params.onset_min_gap * 1000.0
        ));

        let detector = OnsetDetector::new(ctx.reader(), ctx.params.onset_config());
        let reference = detector.detect(&resolve_sources(repo, &collected.reference_segments));
        let target = detector.detect(&resolve_sources(repo, &collected.target_segments));

        ctx.logger.info(&format!("Reference onsets: {}", reference.len()));
        ctx.logger.info(&format!("Target onsets: {}", target.len()));

        let empty = reference.is_empty() || target.is_empty();
        state.onsets = Some(OnsetOutput { reference, target });

        if empty {
            return Ok(StepOutcome::Halt(NothingToDo::NoOnsets));
        }
        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        if state.onsets.is_none() {
            return Err(StepError::invalid_output("Onsets were not recorded"));
        }
        Ok(())
    }
}

/// Copies of `segments` whose file points where the host keeps the audio.
fn resolve_sources(repo: &dyn TrackRepository, segments: &[Segment]) -> Vec<Segment> {
    segments
        .iter()
        .map(|segment| Segment {
            file: repo.source_path(segment),
            ..segment.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioReader, AudioWindow};
    use crate::logging::RunLogger;
    use crate::models::{SegmentId, TrackRef};
    use crate::orchestrator::types::{AlignRequest, CollectOutput};
    use crate::timeline::{InMemoryTimeline, Project};
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    const RATE: f64 = 22050.0;

    /// Returns the same click track for every path and remembers the paths.
    struct ClickReader {
        samples: Vec<f64>,
        paths: Mutex<Vec<PathBuf>>,
    }

    impl ClickReader {
        fn new(clicks: &[f64]) -> Self {
            let mut samples = vec![0.0; (2.0 * RATE) as usize];
            for &t in clicks {
                let start = (t * RATE) as usize;
                for j in 0..400 {
                    samples[start + j] = 0.8 * (-(j as f64) / 80.0).exp() * (j as f64 * 0.3).sin();
                }
            }
            Self {
                samples,
                paths: Mutex::new(Vec::new()),
            }
        }
    }

    impl AudioReader for ClickReader {
        fn read_window(&self, path: &Path, _offset: f64, _duration: f64) -> AudioWindow {
            self.paths.lock().push(path.to_path_buf());
            AudioWindow::new(self.samples.clone(), RATE)
        }
    }

    fn state_with(reference: Vec<Segment>, target: Vec<Segment>) -> AlignState {
        let mut state = AlignState::new("detect");
        state.collected = Some(CollectOutput {
            reference_name: "Guide".to_string(),
            target_name: "Bass".to_string(),
            reference_segments: reference,
            target_segments: target,
        });
        state
    }

    fn seg(id: u64, file: &str) -> Segment {
        Segment::new(SegmentId(id), 0.0, 2.0, file, 0.0)
    }

    fn context(reader: Arc<ClickReader>) -> Context {
        let request = AlignRequest::new(TrackRef(0), TrackRef(1), 15.0, 0.0);
        Context::new(request, "detect", Arc::new(RunLogger::silent())).with_reader(reader)
    }

    #[test]
    fn detects_on_resolved_paths() {
        let reader = Arc::new(ClickReader::new(&[0.5, 1.5]));
        let ctx = context(Arc::clone(&reader));
        let mut repo = InMemoryTimeline::new(Project::default()).with_base_dir("/audio");
        let mut state = state_with(vec![seg(1, "guide.wav")], vec![seg(2, "/abs/bass.wav")]);

        let outcome = DetectStep::new().execute(&ctx, &mut repo, &mut state).unwrap();
        assert_eq!(outcome, StepOutcome::Continue);

        let onsets = state.onsets.unwrap();
        assert_eq!(onsets.reference.len(), 2);
        assert_eq!(onsets.target.len(), 2);

        let paths = reader.paths.lock();
        assert_eq!(paths[0], PathBuf::from("/audio/guide.wav"));
        assert_eq!(paths[1], PathBuf::from("/abs/bass.wav"));
    }

    #[test]
    fn unreadable_audio_halts_with_no_onsets() {
        let ctx = Context::new(
            AlignRequest::new(TrackRef(0), TrackRef(1), 15.0, 0.0),
            "detect",
            Arc::new(RunLogger::silent()),
        );
        let mut repo = InMemoryTimeline::new(Project::default());
        let mut state = state_with(vec![seg(1, "missing.wav")], vec![seg(2, "missing.wav")]);

        let outcome = DetectStep::new().execute(&ctx, &mut repo, &mut state).unwrap();
        assert_eq!(outcome, StepOutcome::Halt(NothingToDo::NoOnsets));
        assert!(state.onsets.unwrap().reference.is_empty());
    }

    #[test]
    fn requires_collected_segments() {
        let reader = Arc::new(ClickReader::new(&[]));
        let state = AlignState::new("detect");
        assert!(DetectStep::new().validate_input(&context(reader), &state).is_err());
    }
}
