// src/lib.rs

pub mod artifacts;
pub mod assets;
pub mod client;
pub mod config;
pub mod controller;
pub mod enhancements;
pub mod history;
pub mod jobs;
pub mod media;
pub mod suggestions;
pub mod timeline;

#[cfg(test)]
mod suggestion_tests;

pub use assets::{AssetKind, AssetStore, MediaAsset, MediaMetadata};
pub use client::{
    AspectRatio, GenerationService, HttpGenerationService, JobHandle, JobPoll, RemoteArtifact,
    ServiceError,
};
pub use config::Config;
pub use controller::{AppController, ControllerError, Feature};
pub use history::{EditHistory, Snapshot};
pub use jobs::{CancelToken, GeneratedArtifact, JobError, JobRunner, PollConfig};
pub use media::{FfmpegToolkit, MediaError, MediaToolkit};
pub use timeline::{Clip, ClipStatus, TimelineState, Track, AUDIO_TRACK, VIDEO_TRACK};
