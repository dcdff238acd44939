// src/controller.rs
use crate::artifacts::{ArtifactKind, ArtifactLog};
use crate::assets::{AssetKind, AssetStore, MediaAsset};
use crate::client::{
    AspectRatio, BackgroundRequest, ExtendRequest, GenerationRequest, GenerationService,
    JobHandle, StitchRequest,
};
use crate::config::Config;
use crate::enhancements::{AttributePatch, BackgroundEdit, Caption, ColorGrade, SceneMarker};
use crate::history::{EditHistory, Snapshot};
use crate::jobs::{CancelToken, GeneratedArtifact, JobError, JobRunner};
use crate::media::{MediaError, MediaToolkit};
use crate::suggestions;
use crate::timeline::{Clip, ClipStatus, TimelineError, TimelineState, VIDEO_TRACK};
use futures::join;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Stand-in length for a clip whose media has not been probed yet.
const PLACEHOLDER_DURATION: f64 = 8.0;

/// Grab the end frame slightly inside the clip so the seek cannot land past
/// the last packet.
const END_FRAME_BACKOFF: f64 = 0.05;

/// One busy flag per feature class: a feature cannot be re-submitted while
/// its previous job is outstanding, but independent features may overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    Generate,
    Stitch,
    Extend,
    Background,
    Captions,
    ColorGrade,
    SceneScan,
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("{0:?} is already running; wait for it to finish")]
    Busy(Feature),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("Asset {0} not found")]
    AssetNotFound(String),
    #[error("Clip {0} has no asset bound yet")]
    AssetNotReady(String),
    #[error("Clip {0} was not produced by the generation service and cannot be edited by it")]
    MissingRemoteHandle(String),
    #[error("Stitching needs at least two ready clips on the video track")]
    NotEnoughClips,
    #[error("No clip selected and nothing ready to target")]
    NoTarget,
    #[error("Advisory analysis failed: {0}")]
    Advisory(String),
    #[error("Could not read media at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Everything undo/redo snapshots: the whole editable state.
#[derive(Debug, Default)]
struct EditorState {
    assets: AssetStore,
    timeline: TimelineState,
    selection: Option<String>,
}

impl EditorState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            assets: self.assets.clone(),
            timeline: self.timeline.clone(),
            selection: self.selection.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.assets = snapshot.assets;
        self.timeline = snapshot.timeline;
        self.selection = snapshot.selection;
    }
}

/// Clears the feature's busy flag on every exit path, error paths included.
struct BusyGuard<'a> {
    flags: &'a Mutex<HashSet<Feature>>,
    feature: Feature,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        lock(self.flags).remove(&self.feature);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wires user actions to job submissions, applies optimistic timeline
/// updates, commits results, and records history. All mutations of the
/// shared state funnel through [`perform_action`](Self::perform_action),
/// which is what keeps the one-checkpoint-per-action invariant honest.
pub struct AppController<S, M> {
    state: Mutex<EditorState>,
    history: Mutex<EditHistory>,
    busy: Mutex<HashSet<Feature>>,
    active_jobs: Mutex<HashMap<String, CancelToken>>,
    service: Arc<S>,
    runner: JobRunner<S>,
    media: M,
    artifacts: ArtifactLog,
    config: Config,
}

impl<S: GenerationService, M: MediaToolkit> AppController<S, M> {
    pub fn new(service: Arc<S>, media: M, config: Config) -> Self {
        let runner = JobRunner::new(service.clone(), config.poll);
        let artifacts = ArtifactLog::new(config.artifact_dir.clone());
        Self {
            state: Mutex::new(EditorState::default()),
            history: Mutex::new(EditHistory::new()),
            busy: Mutex::new(HashSet::new()),
            active_jobs: Mutex::new(HashMap::new()),
            service,
            runner,
            media,
            artifacts,
            config,
        }
    }

    // --- STATE ACCESS ---

    pub fn timeline(&self) -> TimelineState {
        lock(&self.state).timeline.clone()
    }

    pub fn assets(&self) -> AssetStore {
        lock(&self.state).assets.clone()
    }

    pub fn selection(&self) -> Option<String> {
        lock(&self.state).selection.clone()
    }

    /// The single entry point for state mutation. Checkpointing here, and
    /// only here, is what guarantees the pre-mutation snapshot is pushed
    /// exactly once per logical user action; call sites cannot get the
    /// ordering wrong.
    fn perform_action<T>(&self, checkpoint: bool, mutator: impl FnOnce(&mut EditorState) -> T) -> T {
        let mut state = lock(&self.state);
        if checkpoint {
            let snapshot = state.snapshot();
            lock(&self.history).checkpoint(snapshot);
        }
        mutator(&mut state)
    }

    fn acquire(&self, feature: Feature) -> Result<BusyGuard<'_>, ControllerError> {
        let mut flags = lock(&self.busy);
        if !flags.insert(feature) {
            return Err(ControllerError::Busy(feature));
        }
        Ok(BusyGuard {
            flags: &self.busy,
            feature,
        })
    }

    // --- HISTORY ---

    pub fn undo(&self) -> bool {
        let mut state = lock(&self.state);
        let current = state.snapshot();
        match lock(&self.history).undo(current) {
            Some(restored) => {
                state.restore(restored);
                true
            }
            None => false,
        }
    }

    pub fn redo(&self) -> bool {
        let mut state = lock(&self.state);
        let current = state.snapshot();
        match lock(&self.history).redo(current) {
            Some(restored) => {
                state.restore(restored);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        lock(&self.history).can_undo()
    }

    pub fn can_redo(&self) -> bool {
        lock(&self.history).can_redo()
    }

    // --- MANUAL EDITS ---

    /// Register an uploaded file. Probing fills what it can; a probe failure
    /// leaves metadata unknown rather than inventing zeros.
    pub fn import_media(&self, path: &str, kind: AssetKind) -> MediaAsset {
        let metadata = match self.media.probe(Path::new(path)) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Probe failed for {}: {}", path, e);
                None
            }
        };
        let mut asset = MediaAsset::new(kind, path);
        asset.metadata = metadata;
        self.perform_action(true, |state| {
            state.assets.append(vec![asset.clone()]);
        });
        info!("📥 Imported {:?} asset {}", kind, asset.id);
        asset
    }

    /// Place a stored asset at the end of a track as a Ready clip.
    pub fn add_clip(&self, asset_id: &str, track_id: &str) -> Result<Clip, ControllerError> {
        self.perform_action(true, |state| {
            let asset = state
                .assets
                .find(asset_id)
                .ok_or_else(|| ControllerError::AssetNotFound(asset_id.to_string()))?;
            let duration = asset
                .metadata
                .as_ref()
                .and_then(|m| m.duration)
                .unwrap_or(PLACEHOLDER_DURATION);
            let start = state.timeline.track_end(track_id);
            let clip = state.timeline.insert_clip(track_id, asset_id, start, duration)?;
            Ok(clip)
        })
    }

    pub fn remove_clip(&self, clip_id: &str) -> Result<(), ControllerError> {
        self.perform_action(true, |state| {
            state.timeline.remove(clip_id)?;
            if state.selection.as_deref() == Some(clip_id) {
                state.selection = None;
            }
            Ok(())
        })
    }

    pub fn move_clip(&self, clip_id: &str, new_start: f64) -> Result<(), ControllerError> {
        self.perform_action(true, |state| Ok(state.timeline.move_clip(clip_id, new_start)?))
    }

    pub fn set_attributes(&self, clip_id: &str, patch: AttributePatch) -> Result<(), ControllerError> {
        self.perform_action(true, |state| Ok(state.timeline.apply_patch(clip_id, patch)?))
    }

    /// Selection is part of the snapshot but changing it is not an undoable
    /// action of its own.
    pub fn select_clip(&self, clip_id: Option<&str>) {
        self.perform_action(false, |state| {
            state.selection = clip_id.map(|id| id.to_string());
        });
    }

    // --- EDIT FEATURES (timeline-affecting, submit → placeholder → await) ---

    /// Generate a brand-new clip from a prompt, optionally steered by a
    /// reference image asset. The placeholder appears as soon as the
    /// submission is accepted; a rejected submission leaves nothing behind.
    pub async fn generate(
        &self,
        prompt: &str,
        aspect: Option<AspectRatio>,
        reference_asset: Option<&str>,
    ) -> Result<Clip, ControllerError> {
        let _busy = self.acquire(Feature::Generate)?;
        let aspect = aspect.unwrap_or(self.config.default_aspect);
        let reference_image = match reference_asset {
            Some(asset_id) => Some(self.read_asset_bytes(asset_id)?),
            None => None,
        };

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            aspect,
            reference_image,
        };
        let handle = self.runner.submit_generation(&request).await?;
        self.artifacts.record(
            ArtifactKind::JobSpec,
            &format!("generate [{}]: {}", aspect.as_str(), prompt),
        );
        info!("🚀 Generation job {} submitted: '{}'", handle.0, prompt);

        let placeholder = self.perform_action(true, |state| {
            let start = state.timeline.track_end(VIDEO_TRACK);
            state
                .timeline
                .insert_placeholder(VIDEO_TRACK, start, PLACEHOLDER_DURATION)
        })?;

        self.run_to_completion(handle, &placeholder.id).await
    }

    /// Bridge the last two ready clips on the video track with a generated
    /// transition. Reference policy is positional: the pair is always the
    /// last two ready clips, regardless of selection.
    pub async fn stitch(
        &self,
        prompt: &str,
        aspect: Option<AspectRatio>,
    ) -> Result<Clip, ControllerError> {
        let _busy = self.acquire(Feature::Stitch)?;
        let aspect = aspect.unwrap_or(self.config.default_aspect);

        let (first_path, first_end, second_path) = {
            let state = lock(&self.state);
            let (first, second) = state
                .timeline
                .last_two_ready(VIDEO_TRACK)
                .ok_or(ControllerError::NotEnoughClips)?;
            let first_asset = self.resolve_asset(&state.assets, first)?;
            let second_asset = self.resolve_asset(&state.assets, second)?;
            let first_end = first_asset
                .metadata
                .as_ref()
                .and_then(|m| m.duration)
                .unwrap_or(first.duration);
            (
                first_asset.local_path.clone(),
                first_end,
                second_asset.local_path.clone(),
            )
        };

        // The job bridges the visual gap: last frame of A to first frame of B
        let start_frame = self
            .media
            .extract_frame(Path::new(&first_path), (first_end - END_FRAME_BACKOFF).max(0.0))?;
        let end_frame = self.media.extract_frame(Path::new(&second_path), 0.0)?;

        let request = StitchRequest {
            prompt: prompt.to_string(),
            start_frame,
            end_frame,
            aspect,
        };
        let handle = self.runner.submit_stitch(&request).await?;
        self.artifacts.record(
            ArtifactKind::JobSpec,
            &format!("stitch [{}]: {}", aspect.as_str(), prompt),
        );
        info!("🚀 Stitch job {} submitted", handle.0);

        let placeholder = self.perform_action(true, |state| {
            let start = state.timeline.track_end(VIDEO_TRACK);
            state
                .timeline
                .insert_placeholder(VIDEO_TRACK, start, PLACEHOLDER_DURATION)
        })?;

        self.run_to_completion(handle, &placeholder.id).await
    }

    /// Continue a generated clip. Targets the selected clip, falling back to
    /// the last ready clip on the video track. Only clips whose asset came
    /// from the service (has a remote handle) can be extended; everything
    /// else fails here, before anything is submitted or inserted.
    pub async fn extend(
        &self,
        prompt: &str,
        aspect: Option<AspectRatio>,
    ) -> Result<Clip, ControllerError> {
        let _busy = self.acquire(Feature::Extend)?;
        let aspect = aspect.unwrap_or(self.config.default_aspect);

        let (source_clip_id, remote_handle) = {
            let state = lock(&self.state);
            let clip = match &state.selection {
                Some(id) => state
                    .timeline
                    .find_clip(id)
                    .ok_or_else(|| TimelineError::ClipNotFound(id.clone()))?,
                None => state
                    .timeline
                    .last_ready(VIDEO_TRACK)
                    .ok_or(ControllerError::NoTarget)?,
            };
            let asset = self.resolve_asset(&state.assets, clip)?;
            let remote_handle = asset
                .remote_handle
                .clone()
                .ok_or_else(|| ControllerError::MissingRemoteHandle(clip.id.clone()))?;
            (clip.id.clone(), remote_handle)
        };

        let request = ExtendRequest {
            prompt: prompt.to_string(),
            remote_handle,
            aspect,
        };
        let handle = self.runner.submit_extend(&request).await?;
        self.artifacts.record(
            ArtifactKind::JobSpec,
            &format!("extend {} [{}]: {}", source_clip_id, aspect.as_str(), prompt),
        );
        info!("🚀 Extend job {} submitted from clip {}", handle.0, source_clip_id);

        let placeholder = self.perform_action(true, |state| {
            let start = state.timeline.track_end(VIDEO_TRACK);
            let clip = state
                .timeline
                .insert_placeholder(VIDEO_TRACK, start, PLACEHOLDER_DURATION)?;
            state.timeline.link_lineage(&clip.id, &source_clip_id)?;
            Ok::<_, TimelineError>(clip)
        })?;

        self.run_to_completion(handle, &placeholder.id).await
    }

    /// Replace the background of an existing generated clip, in place: the
    /// clip cycles Ready → Generating → Ready and comes back bound to the
    /// replacement asset. The original asset stays in the store.
    pub async fn remove_background(
        &self,
        clip_id: &str,
        target_color: &str,
    ) -> Result<Clip, ControllerError> {
        let _busy = self.acquire(Feature::Background)?;

        let remote_handle = {
            let state = lock(&self.state);
            let clip = state
                .timeline
                .find_clip(clip_id)
                .ok_or_else(|| TimelineError::ClipNotFound(clip_id.to_string()))?;
            let asset = self.resolve_asset(&state.assets, clip)?;
            asset
                .remote_handle
                .clone()
                .ok_or_else(|| ControllerError::MissingRemoteHandle(clip_id.to_string()))?
        };

        let request = BackgroundRequest {
            remote_handle,
            target_color: target_color.to_string(),
        };
        let handle = self.runner.submit_background_replace(&request).await?;
        self.artifacts.record(
            ArtifactKind::JobSpec,
            &format!("background_replace {} -> {}", clip_id, target_color),
        );
        info!("🚀 Background job {} submitted for clip {}", handle.0, clip_id);

        self.perform_action(true, |state| state.timeline.begin_regenerate(clip_id))?;

        self.run_to_completion(handle, clip_id).await?;
        self.perform_action(false, |state| {
            state.timeline.apply_patch(
                clip_id,
                AttributePatch::background(BackgroundEdit {
                    target_color: target_color.to_string(),
                }),
            )?;
            state
                .timeline
                .find_clip(clip_id)
                .cloned()
                .ok_or_else(|| ControllerError::Timeline(TimelineError::ClipNotFound(clip_id.to_string())))
        })
    }

    /// Cancel an in-flight job by its handle id. The poll loop notices at
    /// its next cycle and the affected clip is finalized as errored.
    pub fn cancel_job(&self, handle_id: &str) -> bool {
        match lock(&self.active_jobs).get(handle_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_jobs(&self) -> Vec<String> {
        lock(&self.active_jobs).keys().cloned().collect()
    }

    // --- ADVISORY FEATURES (attribute-only, never corrupt the timeline) ---

    /// Ask the service for captions and attach them to the clip. Unparseable
    /// suggestions degrade to no captions, never to garbage in the state.
    pub async fn generate_captions(&self, clip_id: &str) -> Result<Vec<Caption>, ControllerError> {
        let _busy = self.acquire(Feature::Captions)?;
        let media = self.read_clip_media(clip_id)?;
        let raw = self
            .service
            .generate_captions(&media)
            .await
            .map_err(|e| ControllerError::Advisory(e.to_string()))?;
        self.artifacts.record(ArtifactKind::AdvisoryResponse, &raw);

        let captions = suggestions::parse_caption_list(&raw).unwrap_or_else(|e| {
            warn!("Caption response unusable, falling back to none: {}", e);
            Vec::new()
        });
        self.perform_action(true, |state| {
            state
                .timeline
                .apply_patch(clip_id, AttributePatch::captions(captions.clone()))
        })?;
        Ok(captions)
    }

    /// Ask for grading parameters matching a vibe description. A malformed
    /// suggestion degrades to the neutral grade.
    pub async fn suggest_color_grade(
        &self,
        clip_id: &str,
        vibe: &str,
    ) -> Result<ColorGrade, ControllerError> {
        let _busy = self.acquire(Feature::ColorGrade)?;
        let media = self.read_clip_media(clip_id)?;
        let raw = self
            .service
            .suggest_color_grade(&media, vibe)
            .await
            .map_err(|e| ControllerError::Advisory(e.to_string()))?;
        self.artifacts.record(ArtifactKind::AdvisoryResponse, &raw);

        let grade = suggestions::parse_color_grade(&raw).unwrap_or_else(|e| {
            warn!("Grade response unusable, falling back to neutral: {}", e);
            ColorGrade::default()
        });
        self.perform_action(true, |state| {
            state
                .timeline
                .apply_patch(clip_id, AttributePatch::color_grade(grade.clone()))
        })?;
        Ok(grade)
    }

    /// Detect scene boundaries and mark them on the clip.
    pub async fn scan_scenes(&self, clip_id: &str) -> Result<Vec<SceneMarker>, ControllerError> {
        let _busy = self.acquire(Feature::SceneScan)?;
        let media = self.read_clip_media(clip_id)?;
        let raw = self
            .service
            .analyze_scenes(&media)
            .await
            .map_err(|e| ControllerError::Advisory(e.to_string()))?;
        self.artifacts.record(ArtifactKind::AdvisoryResponse, &raw);

        let markers = suggestions::parse_scene_list(&raw).unwrap_or_else(|e| {
            warn!("Scene response unusable, falling back to none: {}", e);
            Vec::new()
        });
        self.perform_action(true, |state| {
            state
                .timeline
                .apply_patch(clip_id, AttributePatch::scene_markers(markers.clone()))
        })?;
        Ok(markers)
    }

    /// Run every advisory analysis on one clip concurrently. The three jobs
    /// patch disjoint attributes, so their finalizes commute.
    pub async fn analyze_clip(
        &self,
        clip_id: &str,
        vibe: &str,
    ) -> (
        Result<Vec<Caption>, ControllerError>,
        Result<ColorGrade, ControllerError>,
        Result<Vec<SceneMarker>, ControllerError>,
    ) {
        join!(
            self.generate_captions(clip_id),
            self.suggest_color_grade(clip_id, vibe),
            self.scan_scenes(clip_id)
        )
    }

    // --- SHARED PLUMBING ---

    /// Await a submitted job and commit its outcome to the clip that is
    /// waiting for it. Failures flip the clip to Error rather than removing
    /// it; the user decides whether to retry or delete.
    async fn run_to_completion(
        &self,
        handle: JobHandle,
        clip_id: &str,
    ) -> Result<Clip, ControllerError> {
        let cancel = CancelToken::new();
        lock(&self.active_jobs).insert(handle.0.clone(), cancel.clone());
        let outcome = self.runner.await_result(&handle, &cancel).await;
        lock(&self.active_jobs).remove(&handle.0);

        let applied = match outcome {
            Ok(artifact) => self.apply_result(clip_id, artifact),
            Err(e) => Err(ControllerError::Job(e)),
        };

        if let Err(ref e) = applied {
            warn!("❌ Edit job {} failed: {}", handle.0, e);
            self.perform_action(false, |state| {
                if let Err(missing) = state.timeline.finalize(clip_id, None, ClipStatus::Error, None)
                {
                    warn!("Could not mark clip {} as errored: {}", clip_id, missing);
                }
            });
        }
        applied
    }

    /// Commit a finished job: append the new asset, then bind it to the
    /// waiting clip. If the clip was undone away mid-flight the asset is
    /// kept anyway (the store is append-only) and only the binding is lost.
    fn apply_result(
        &self,
        clip_id: &str,
        artifact: GeneratedArtifact,
    ) -> Result<Clip, ControllerError> {
        let asset = self.store_artifact(artifact)?;
        let duration = asset.metadata.as_ref().and_then(|m| m.duration);
        let asset_id = asset.id.clone();

        self.perform_action(false, |state| {
            state.assets.append(vec![asset]);
            state
                .timeline
                .finalize(clip_id, Some(asset_id), ClipStatus::Ready, duration)?;
            let clip = state
                .timeline
                .find_clip(clip_id)
                .cloned()
                .ok_or_else(|| TimelineError::ClipNotFound(clip_id.to_string()))?;
            info!("✅ Clip {} ready ({:.2}s)", clip.id, clip.duration);
            Ok(clip)
        })
    }

    /// Persist downloaded bytes under the media dir and wrap them as a new
    /// video asset carrying the remote handle for future chained edits.
    fn store_artifact(&self, artifact: GeneratedArtifact) -> Result<MediaAsset, ControllerError> {
        std::fs::create_dir_all(&self.config.media_dir).map_err(|source| ControllerError::Io {
            path: self.config.media_dir.to_string_lossy().to_string(),
            source,
        })?;
        let path = self
            .config
            .media_dir
            .join(format!("generated_{}.mp4", Uuid::new_v4()));
        std::fs::write(&path, &artifact.bytes).map_err(|source| ControllerError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        })?;

        let metadata = match self.media.probe(&path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                // Unknown metadata is fine; zeroed metadata would not be
                warn!("Probe failed for generated media {:?}: {}", path, e);
                None
            }
        };

        let mut asset = MediaAsset::new(AssetKind::Video, path.to_string_lossy())
            .with_remote_handle(artifact.remote_handle);
        asset.metadata = metadata;
        Ok(asset)
    }

    fn resolve_asset<'a>(
        &self,
        assets: &'a AssetStore,
        clip: &Clip,
    ) -> Result<&'a MediaAsset, ControllerError> {
        let asset_id = clip
            .asset_id
            .as_ref()
            .ok_or_else(|| ControllerError::AssetNotReady(clip.id.clone()))?;
        assets
            .find(asset_id)
            .ok_or_else(|| ControllerError::AssetNotFound(asset_id.clone()))
    }

    fn read_asset_bytes(&self, asset_id: &str) -> Result<Vec<u8>, ControllerError> {
        let path = {
            let state = lock(&self.state);
            state
                .assets
                .find(asset_id)
                .ok_or_else(|| ControllerError::AssetNotFound(asset_id.to_string()))?
                .local_path
                .clone()
        };
        std::fs::read(&path).map_err(|source| ControllerError::Io { path, source })
    }

    fn read_clip_media(&self, clip_id: &str) -> Result<Vec<u8>, ControllerError> {
        let path = {
            let state = lock(&self.state);
            let clip = state
                .timeline
                .find_clip(clip_id)
                .ok_or_else(|| TimelineError::ClipNotFound(clip_id.to_string()))?;
            self.resolve_asset(&state.assets, clip)?.local_path.clone()
        };
        std::fs::read(&path).map_err(|source| ControllerError::Io { path, source })
    }
}
