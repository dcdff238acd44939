// src/assets.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Image,
    Audio,
}

// Probed media properties. Populated asynchronously after decode; until then
// downstream code must treat every field as unknown, not as zero.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MediaMetadata {
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MediaAsset {
    pub id: String,
    pub kind: AssetKind,
    /// Locally playable bytes (a file path in this engine).
    pub local_path: String,
    /// Identifier the generation service returned for this artifact.
    /// Required input for chained edit jobs; absent for uploads.
    pub remote_handle: Option<String>,
    pub metadata: Option<MediaMetadata>,
    pub created_at: DateTime<Utc>,
}

impl MediaAsset {
    pub fn new(kind: AssetKind, local_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            local_path: local_path.into(),
            remote_handle: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_remote_handle(mut self, handle: impl Into<String>) -> Self {
        self.remote_handle = Some(handle.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// Append-only store of media references. Assets are never deleted, only
// superseded by newer appends.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AssetStore {
    assets: Vec<MediaAsset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add assets to the store. An incoming asset whose id already exists is
    /// merged into the existing record: later `Some` fields win, everything
    /// else is kept. This is how late-arriving metadata lands.
    pub fn append(&mut self, assets: Vec<MediaAsset>) {
        for incoming in assets {
            match self.assets.iter().position(|a| a.id == incoming.id) {
                Some(index) => merge_asset(&mut self.assets[index], incoming),
                None => self.assets.push(incoming),
            }
        }
    }

    /// Absence means "not ready yet", never a fault: a clip mid-generation
    /// legitimately references an id that is not here.
    pub fn find(&self, id: &str) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Attach probe results to an already-stored asset.
    pub fn attach_metadata(&mut self, id: &str, metadata: MediaMetadata) {
        if let Some(asset) = self.assets.iter_mut().find(|a| a.id == id) {
            merge_metadata(asset, metadata);
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaAsset> {
        self.assets.iter()
    }
}

fn merge_asset(existing: &mut MediaAsset, incoming: MediaAsset) {
    if incoming.remote_handle.is_some() {
        existing.remote_handle = incoming.remote_handle;
    }
    if !incoming.local_path.is_empty() {
        existing.local_path = incoming.local_path;
    }
    if let Some(metadata) = incoming.metadata {
        merge_metadata(existing, metadata);
    }
}

fn merge_metadata(asset: &mut MediaAsset, incoming: MediaMetadata) {
    let current = asset.metadata.get_or_insert_with(MediaMetadata::default);
    if incoming.duration.is_some() {
        current.duration = incoming.duration;
    }
    if incoming.width.is_some() {
        current.width = incoming.width;
    }
    if incoming.height.is_some() {
        current.height = incoming.height;
    }
    if incoming.codec.is_some() {
        current.codec = incoming.codec;
    }
}
