// src/jobs.rs
use crate::client::{
    BackgroundRequest, ExtendRequest, GenerationRequest, GenerationService, JobHandle,
    StitchRequest,
};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Error, Debug)]
pub enum JobError {
    /// The collaborator rejected the request outright (bad credential,
    /// malformed spec). Nothing was started; surface this to the user.
    #[error("Submission rejected: {0}")]
    Submission(String),
    /// The collaborator reported a terminal failure while we were polling.
    #[error("Generation failed: {0}")]
    Generation(String),
    /// The collaborator claimed success but handed back no usable result.
    /// Fatal for the job; never retried.
    #[error("Job finished without a result artifact")]
    MalformedResult,
    #[error("Job exceeded the maximum wait of {0:?}")]
    Timeout(Duration),
    #[error("Job was cancelled")]
    Cancelled,
}

/// Cooperative cancellation, checked at every poll cycle. Cloning shares the
/// flag, so the controller can keep one end in its registry.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    /// Fixed interval between status queries. Generation jobs run for
    /// seconds to minutes, so a constant interval bounds polling overhead
    /// without hurting perceived latency; no backoff needed.
    pub interval: Duration,
    /// Hard cap on total waiting, so a stuck job cannot hang a feature
    /// forever.
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600),
        }
    }
}

/// A finished job, resolved to something locally usable: the downloaded
/// bytes plus the remote handle later edit jobs will chain from.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub remote_handle: String,
    pub bytes: Vec<u8>,
}

/// Wraps one long-running operation against the generation service:
/// submit, poll until terminal, map to a playable result or a failure.
pub struct JobRunner<S> {
    service: Arc<S>,
    poll: PollConfig,
}

impl<S: GenerationService> JobRunner<S> {
    pub fn new(service: Arc<S>, poll: PollConfig) -> Self {
        Self { service, poll }
    }

    pub async fn submit_generation(&self, req: &GenerationRequest) -> Result<JobHandle, JobError> {
        self.service
            .submit_generation(req)
            .await
            .map_err(|e| JobError::Submission(e.to_string()))
    }

    pub async fn submit_stitch(&self, req: &StitchRequest) -> Result<JobHandle, JobError> {
        self.service
            .submit_stitch(req)
            .await
            .map_err(|e| JobError::Submission(e.to_string()))
    }

    pub async fn submit_extend(&self, req: &ExtendRequest) -> Result<JobHandle, JobError> {
        self.service
            .submit_extend(req)
            .await
            .map_err(|e| JobError::Submission(e.to_string()))
    }

    pub async fn submit_background_replace(
        &self,
        req: &BackgroundRequest,
    ) -> Result<JobHandle, JobError> {
        self.service
            .submit_background_replace(req)
            .await
            .map_err(|e| JobError::Submission(e.to_string()))
    }

    /// Poll until the job reaches a terminal state, then resolve the result
    /// descriptor into downloaded bytes. Suspends only the calling task.
    ///
    /// The loop queries first and sleeps between queries, so a job scripted
    /// as {not-done, not-done, done} costs exactly two sleep cycles.
    pub async fn await_result(
        &self,
        handle: &JobHandle,
        cancel: &CancelToken,
    ) -> Result<GeneratedArtifact, JobError> {
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                info!("Job {} cancelled while polling", handle.0);
                return Err(JobError::Cancelled);
            }

            let poll = self
                .service
                .poll_job(handle)
                .await
                .map_err(|e| JobError::Generation(e.to_string()))?;

            if let Some(message) = poll.error {
                warn!("Job {} reported terminal failure: {}", handle.0, message);
                return Err(JobError::Generation(message));
            }

            if poll.done {
                // A "done" status with no descriptor is unrecoverable for
                // this job; retrying would just re-read the same answer.
                let artifact = poll.result.ok_or(JobError::MalformedResult)?;
                let bytes = self
                    .service
                    .fetch_artifact(&artifact)
                    .await
                    .map_err(|e| JobError::Generation(e.to_string()))?;
                info!(
                    "Job {} complete ({} bytes, handle {})",
                    handle.0,
                    bytes.len(),
                    artifact.handle
                );
                return Ok(GeneratedArtifact {
                    remote_handle: artifact.handle,
                    bytes,
                });
            }

            if started.elapsed() >= self.poll.max_wait {
                return Err(JobError::Timeout(self.poll.max_wait));
            }

            debug!("Job {} still running, sleeping {:?}", handle.0, self.poll.interval);
            tokio::time::sleep(self.poll.interval).await;
        }
    }
}
