//! In-memory timeline host backed by a JSON project document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::probe_wav;
use crate::models::{Segment, SegmentId, TrackRef};

use super::types::{TimelineError, TimelineResult};
use super::TrackRepository;

/// One track of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Track {
    pub fn new(name: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            name: name.into(),
            segments,
        }
    }
}

/// Serializable project document.
///
/// ```json
/// {
///   "tracks": [{ "name": "Drums", "segments": [{ "id": 1, "position": 0.0, "length": 4.0, "file": "drums.wav" }] }],
///   "source_durations": { "drums.wav": 180.0 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Known source file lengths (seconds). Files missing here are probed.
    #[serde(default)]
    pub source_durations: BTreeMap<PathBuf, f64>,
}

impl Project {
    /// Copy with every relative source path joined onto `dir`.
    fn rebased(&self, dir: &Path) -> Project {
        let rebase = |file: &Path| -> PathBuf {
            if file.is_relative() && !file.as_os_str().is_empty() {
                dir.join(file)
            } else {
                file.to_path_buf()
            }
        };

        let mut project = self.clone();
        for segment in project.tracks.iter_mut().flat_map(|t| t.segments.iter_mut()) {
            segment.file = rebase(segment.file.as_path());
        }
        project.source_durations = self
            .source_durations
            .iter()
            .map(|(file, &secs)| (rebase(file.as_path()), secs))
            .collect();
        project
    }
}

fn absolute_dir(dir: &Path) -> PathBuf {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Timeline host holding a whole project in memory.
#[derive(Debug, Clone)]
pub struct InMemoryTimeline {
    project: Project,
    /// Directory relative source paths are resolved against.
    base_dir: Option<PathBuf>,
    next_id: u64,
}

impl InMemoryTimeline {
    /// Wrap a project document.
    pub fn new(project: Project) -> Self {
        let next_id = project
            .tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .map(|s| s.id.0)
            .max()
            .map_or(1, |max| max + 1);

        Self {
            project,
            base_dir: None,
            next_id,
        }
    }

    /// Load a project from a JSON file.
    ///
    /// Relative source paths in the project resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> TimelineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let project: Project = serde_json::from_str(&content)?;

        let mut timeline = Self::new(project);
        timeline.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(
            "Loaded project {} ({} tracks)",
            path.display(),
            timeline.project.tracks.len()
        );
        Ok(timeline)
    }

    /// Write the project as pretty JSON.
    ///
    /// Saving into a directory other than the one the project was loaded
    /// from rewrites relative source paths as absolute ones, so the written
    /// file still points at the same audio.
    pub fn save(&self, path: impl AsRef<Path>) -> TimelineResult<()> {
        let path = path.as_ref();
        let json = match self.rebase_dir(path) {
            Some(dir) => {
                tracing::debug!("Rebasing relative sources onto {}", dir.display());
                serde_json::to_string_pretty(&self.project.rebased(&dir))?
            }
            None => serde_json::to_string_pretty(&self.project)?,
        };
        fs::write(path, json)?;
        Ok(())
    }

    /// Absolute base directory when `target` lives somewhere else.
    fn rebase_dir(&self, target: &Path) -> Option<PathBuf> {
        let base = absolute_dir(self.base_dir.as_deref()?);
        let target_dir = absolute_dir(target.parent().unwrap_or_else(|| Path::new("")));
        (base != target_dir).then_some(base)
    }

    /// Resolve relative source paths against this directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// The underlying document.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Consume the host and return the document.
    pub fn into_project(self) -> Project {
        self.project
    }

    /// Append a track and return its reference.
    pub fn add_track(&mut self, name: impl Into<String>, segments: Vec<Segment>) -> TrackRef {
        for segment in &segments {
            self.next_id = self.next_id.max(segment.id.0 + 1);
        }
        self.project.tracks.push(Track::new(name, segments));
        TrackRef(self.project.tracks.len() - 1)
    }

    /// Record the length of a source file.
    pub fn set_source_duration(&mut self, file: impl Into<PathBuf>, seconds: f64) {
        self.project.source_durations.insert(file.into(), seconds);
    }

    /// Path a segment's audio is read from.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file.to_path_buf(),
        }
    }

    fn track(&self, track: TrackRef) -> TimelineResult<&Track> {
        self.project
            .tracks
            .get(track.0)
            .ok_or(TimelineError::UnknownTrack(track))
    }

    fn locate(&self, id: SegmentId) -> TimelineResult<(usize, usize)> {
        self.project
            .tracks
            .iter()
            .enumerate()
            .find_map(|(t, track)| {
                track
                    .segments
                    .iter()
                    .position(|s| s.id == id)
                    .map(|s| (t, s))
            })
            .ok_or(TimelineError::UnknownSegment(id))
    }

    fn segment_mut(&mut self, id: SegmentId) -> TimelineResult<&mut Segment> {
        let (t, s) = self.locate(id)?;
        Ok(&mut self.project.tracks[t].segments[s])
    }

    fn allocate_id(&mut self) -> SegmentId {
        let id = SegmentId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl TrackRepository for InMemoryTimeline {
    fn track_count(&self) -> usize {
        self.project.tracks.len()
    }

    fn track_name(&self, track: TrackRef) -> TimelineResult<String> {
        Ok(self.track(track)?.name.clone())
    }

    fn segments(&self, track: TrackRef) -> TimelineResult<Vec<Segment>> {
        Ok(self.track(track)?.segments.clone())
    }

    fn create_derived_track(&mut self, source: TrackRef, segments: &[Segment]) -> TimelineResult<TrackRef> {
        let name = format!("{} (Aligned)", self.track(source)?.name);

        let copies: Vec<Segment> = segments
            .iter()
            .map(|segment| Segment {
                id: self.allocate_id(),
                ..segment.clone()
            })
            .collect();

        let index = source.0 + 1;
        self.project.tracks.insert(index, Track::new(name, copies));
        Ok(TrackRef(index))
    }

    fn split_segment(&mut self, id: SegmentId, time: f64) -> TimelineResult<SegmentId> {
        let (t, s) = self.locate(id)?;
        let original = &self.project.tracks[t].segments[s];
        if !(time > original.position && time < original.end()) {
            return Err(TimelineError::InvalidSplit { id, time });
        }

        let head = time - original.position;
        let mut tail = original.clone();
        tail.position = time;
        tail.length = original.length - head;
        tail.source_offset = original.source_offset + head;
        tail.id = self.allocate_id();
        let tail_id = tail.id;

        let segments = &mut self.project.tracks[t].segments;
        segments[s].length = head;
        segments.insert(s + 1, tail);
        Ok(tail_id)
    }

    fn set_position(&mut self, id: SegmentId, position: f64) -> TimelineResult<()> {
        self.segment_mut(id)?.position = position;
        Ok(())
    }

    fn set_length(&mut self, id: SegmentId, length: f64) -> TimelineResult<()> {
        self.segment_mut(id)?.length = length;
        Ok(())
    }

    fn set_source_offset(&mut self, id: SegmentId, offset: f64) -> TimelineResult<()> {
        self.segment_mut(id)?.source_offset = offset;
        Ok(())
    }

    fn source_path(&self, segment: &Segment) -> PathBuf {
        self.resolve(&segment.file)
    }

    fn segment(&self, id: SegmentId) -> TimelineResult<Segment> {
        let (t, s) = self.locate(id)?;
        Ok(self.project.tracks[t].segments[s].clone())
    }

    fn source_file_duration(&self, id: SegmentId) -> TimelineResult<f64> {
        let segment = self.segment(id)?;
        if !segment.has_source() {
            return Ok(0.0);
        }

        if let Some(&known) = self.project.source_durations.get(&segment.file) {
            return Ok(known);
        }

        match probe_wav(&self.resolve(&segment.file)) {
            Ok(info) => Ok(info.duration_secs),
            Err(e) => {
                tracing::debug!("No duration for {}: {}", segment.file.display(), e);
                Ok(0.0)
            }
        }
    }
}
