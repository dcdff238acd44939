// src/artifacts.rs
use chrono::Utc;
use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What kind of payload is being dumped; becomes the filename prefix.
#[derive(Clone, Copy, Debug)]
pub enum ArtifactKind {
    JobSpec,
    AdvisoryResponse,
    Error,
}

impl ArtifactKind {
    fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::JobSpec => "job_spec",
            ArtifactKind::AdvisoryResponse => "advisory_response",
            ArtifactKind::Error => "error",
        }
    }
}

/// Debug dump of what we sent and what the model said, one timestamped file
/// per entry. Disabled entirely when no directory is configured; failures
/// here never fail the operation being logged.
#[derive(Clone, Debug, Default)]
pub struct ArtifactLog {
    dir: Option<PathBuf>,
}

impl ArtifactLog {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn record(&self, kind: ArtifactKind, content: &str) -> Option<String> {
        let dir = self.dir.as_ref()?;
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Could not create artifact dir {:?}: {}", dir, e);
            return None;
        }

        let filename = format!(
            "artifact_{}_{}.txt",
            kind.prefix(),
            Utc::now().timestamp_millis()
        );
        let file_path = dir.join(&filename);

        if let Err(e) = write_private(&file_path, content) {
            warn!("Could not write artifact {:?}: {}", file_path, e);
            return None;
        }

        debug!("Artifact logged: {}", filename);
        Some(filename)
    }
}

// Model responses can quote user media prompts; keep dumps owner-only.
#[cfg(unix)]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())
}
