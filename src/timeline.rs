// src/timeline.rs
use crate::enhancements::{AttributePatch, ClipAttributes};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const VIDEO_TRACK: &str = "video_track_1";
pub const AUDIO_TRACK: &str = "audio_track_1";

#[derive(Error, Debug, PartialEq)]
pub enum TimelineError {
    #[error("Target clip {0} not found")]
    ClipNotFound(String),
    #[error("Target track {0} not found")]
    TrackNotFound(String),
    #[error("Clip {0} is not in a state that allows this transition")]
    InvalidTransition(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    Pending,
    Generating,
    Ready,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
    pub locked: bool,
    pub visible: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Clip {
    pub id: String,
    pub track_id: String,
    /// Empty while the backing job is in flight. A clip can exist before its
    /// asset exists; that is the whole point of placeholder insertion.
    pub asset_id: Option<String>,
    pub start: f64,    // Start time on timeline (seconds)
    pub duration: f64, // Length of clip (seconds)
    pub status: ClipStatus,
    #[serde(default)]
    pub attributes: ClipAttributes,
    /// Lineage back-reference for extend jobs. Not ownership.
    pub extended_from: Option<String>,
}

impl Clip {
    /// Only a finalized clip with a bound asset may ever reach a player.
    pub fn is_playable(&self) -> bool {
        self.status == ClipStatus::Ready && self.asset_id.is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimelineState {
    pub tracks: Vec<Track>,
    pub clips: Vec<Clip>,
    pub duration: f64,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineState {
    /// Fixed default tracks, composed once. Tracks are never created or
    /// destroyed afterwards.
    pub fn new() -> Self {
        Self {
            tracks: vec![
                Track {
                    id: VIDEO_TRACK.to_string(),
                    kind: TrackKind::Video,
                    locked: false,
                    visible: true,
                },
                Track {
                    id: AUDIO_TRACK.to_string(),
                    kind: TrackKind::Audio,
                    locked: false,
                    visible: true,
                },
            ],
            clips: vec![],
            duration: 0.0,
        }
    }

    pub fn find_clip(&self, id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    fn find_clip_mut(&mut self, id: &str) -> Result<&mut Clip, TimelineError> {
        self.clips
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| TimelineError::ClipNotFound(id.to_string()))
    }

    /// End time of the last clip on a track; where an append lands.
    pub fn track_end(&self, track_id: &str) -> f64 {
        self.clips
            .iter()
            .filter(|c| c.track_id == track_id)
            .map(|c| c.start + c.duration)
            .fold(0.0, f64::max)
    }

    /// Phase one of the optimistic two-phase commit: reserve a position with
    /// a Generating clip that has no asset yet. `duration_hint` stands in
    /// until the real media is probed.
    pub fn insert_placeholder(
        &mut self,
        track_id: &str,
        start: f64,
        duration_hint: f64,
    ) -> Result<Clip, TimelineError> {
        if !self.tracks.iter().any(|t| t.id == track_id) {
            return Err(TimelineError::TrackNotFound(track_id.to_string()));
        }
        let clip = Clip {
            id: Uuid::new_v4().to_string(),
            track_id: track_id.to_string(),
            asset_id: None,
            start,
            duration: duration_hint,
            status: ClipStatus::Generating,
            attributes: ClipAttributes::default(),
            extended_from: None,
        };
        self.clips.push(clip.clone());
        self.recalculate_duration();
        Ok(clip)
    }

    /// Phase two: bind the produced asset and flip the status. Passing
    /// `asset_id = None` leaves any existing binding alone, which is what an
    /// in-place regeneration failure needs.
    pub fn finalize(
        &mut self,
        clip_id: &str,
        asset_id: Option<String>,
        status: ClipStatus,
        probed_duration: Option<f64>,
    ) -> Result<(), TimelineError> {
        let clip = self.find_clip_mut(clip_id)?;
        if let Some(asset_id) = asset_id {
            clip.asset_id = Some(asset_id);
        }
        if let Some(duration) = probed_duration {
            clip.duration = duration;
        }
        clip.status = status;
        self.recalculate_duration();
        Ok(())
    }

    /// Place an already-stored asset on the timeline as a Ready clip. The
    /// manual counterpart to the placeholder/finalize pair.
    pub fn insert_clip(
        &mut self,
        track_id: &str,
        asset_id: &str,
        start: f64,
        duration: f64,
    ) -> Result<Clip, TimelineError> {
        let mut clip = self.insert_placeholder(track_id, start, duration)?;
        self.finalize(&clip.id, Some(asset_id.to_string()), ClipStatus::Ready, None)?;
        clip.asset_id = Some(asset_id.to_string());
        clip.status = ClipStatus::Ready;
        Ok(clip)
    }

    /// Record which clip an extend job continued from. Lineage only.
    pub fn link_lineage(&mut self, clip_id: &str, extended_from: &str) -> Result<(), TimelineError> {
        let clip = self.find_clip_mut(clip_id)?;
        clip.extended_from = Some(extended_from.to_string());
        Ok(())
    }

    /// Re-enter the generating state on a Ready clip for an in-place edit
    /// job. The old asset stays bound until the replacement arrives.
    pub fn begin_regenerate(&mut self, clip_id: &str) -> Result<(), TimelineError> {
        let clip = self.find_clip_mut(clip_id)?;
        if clip.status != ClipStatus::Ready {
            return Err(TimelineError::InvalidTransition(clip_id.to_string()));
        }
        clip.status = ClipStatus::Generating;
        Ok(())
    }

    /// Merge enhancement attributes into a clip. Legal on any existing clip,
    /// Generating included: captions attached mid-flight simply wait for the
    /// clip to resolve.
    pub fn apply_patch(
        &mut self,
        clip_id: &str,
        patch: AttributePatch,
    ) -> Result<(), TimelineError> {
        let clip = self.find_clip_mut(clip_id)?;
        patch.apply(&mut clip.attributes);
        Ok(())
    }

    pub fn remove(&mut self, clip_id: &str) -> Result<(), TimelineError> {
        let index = self
            .clips
            .iter()
            .position(|c| c.id == clip_id)
            .ok_or_else(|| TimelineError::ClipNotFound(clip_id.to_string()))?;
        self.clips.remove(index);
        self.recalculate_duration();
        Ok(())
    }

    pub fn move_clip(&mut self, clip_id: &str, new_start: f64) -> Result<(), TimelineError> {
        let clip = self.find_clip_mut(clip_id)?;
        clip.start = new_start.max(0.0);
        self.recalculate_duration();
        Ok(())
    }

    /// Last two Ready clips on a track, in timeline order. This is the
    /// reference pair a stitch bridges.
    pub fn last_two_ready(&self, track_id: &str) -> Option<(&Clip, &Clip)> {
        let mut ready: Vec<&Clip> = self
            .clips
            .iter()
            .filter(|c| c.track_id == track_id && c.is_playable())
            .collect();
        ready.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        match ready.len() {
            0 | 1 => None,
            n => Some((ready[n - 2], ready[n - 1])),
        }
    }

    /// Last Ready clip on a track; the default extend target.
    pub fn last_ready(&self, track_id: &str) -> Option<&Clip> {
        self.clips
            .iter()
            .filter(|c| c.track_id == track_id && c.is_playable())
            .max_by(|a, b| {
                a.start
                    .partial_cmp(&b.start)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    // Total duration = max(start + duration) over all clips.
    fn recalculate_duration(&mut self) {
        self.duration = self
            .clips
            .iter()
            .map(|c| c.start + c.duration)
            .fold(0.0, f64::max);
    }
}
