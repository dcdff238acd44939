// src/media.rs
use crate::assets::MediaMetadata;
use log::warn;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },
    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: &'static str, stderr: String },
    #[error("Could not read {field} from probe output")]
    MissingField { field: &'static str },
}

/// Local media plumbing the engine needs around the generation service:
/// probing decoded metadata and grabbing single frames as stitch inputs.
pub trait MediaToolkit: Send + Sync {
    /// Probe a file. Fields the prober cannot determine stay `None`;
    /// callers must treat them as unknown, never as zero.
    fn probe(&self, path: &Path) -> Result<MediaMetadata, MediaError>;

    /// Extract one frame at `at_seconds` as PNG bytes.
    fn extract_frame(&self, path: &Path, at_seconds: f64) -> Result<Vec<u8>, MediaError>;
}

#[derive(Clone, Debug, Default)]
pub struct FfmpegToolkit;

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self
    }
}

impl MediaToolkit for FfmpegToolkit {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, MediaError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=width,height,codec_name,codec_type",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|source| MediaError::Spawn {
                tool: "ffprobe",
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::ToolFailed {
                tool: "ffprobe",
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            warn!("Unparseable ffprobe output for {:?}: {}", path, e);
            MediaError::MissingField { field: "format" }
        })?;

        // Duration comes back as a string in the format block
        let duration = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok());

        let video_stream = json["streams"].as_array().and_then(|streams| {
            streams
                .iter()
                .find(|s| s["codec_type"].as_str() == Some("video"))
        });

        Ok(MediaMetadata {
            duration,
            width: video_stream
                .and_then(|s| s["width"].as_u64())
                .map(|w| w as u32),
            height: video_stream
                .and_then(|s| s["height"].as_u64())
                .map(|h| h as u32),
            codec: video_stream
                .and_then(|s| s["codec_name"].as_str())
                .map(|c| c.to_string()),
        })
    }

    fn extract_frame(&self, path: &Path, at_seconds: f64) -> Result<Vec<u8>, MediaError> {
        // Seek before the input for speed; one PNG frame to stdout
        let seek = format!("{:.4}", at_seconds.max(0.0));
        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", seek.as_str(), "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "pipe:1"])
            .output()
            .map_err(|source| MediaError::Spawn {
                tool: "ffmpeg",
                source,
            })?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(MediaError::ToolFailed {
                tool: "ffmpeg",
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(output.stdout)
    }
}
