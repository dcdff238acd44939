// src/client.rs
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Vertical => "9:16",
            AspectRatio::Square => "1:1",
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No API credential configured")]
    MissingCredential,
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Malformed service response: {0}")]
    MalformedResponse(String),
}

/// Opaque reference to one in-flight job on the service side.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JobHandle(pub String);

/// The result descriptor a finished job points at: the durable remote
/// handle (input to chained edit jobs) plus where to download the bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RemoteArtifact {
    pub handle: String,
    pub uri: String,
}

/// One poll answer. Terminal iff `done` or `error` is set.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct JobPoll {
    pub done: bool,
    pub result: Option<RemoteArtifact>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect: AspectRatio,
    /// PNG/JPEG bytes of an optional first-frame reference image.
    pub reference_image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct StitchRequest {
    pub prompt: String,
    pub start_frame: Vec<u8>,
    pub end_frame: Vec<u8>,
    pub aspect: AspectRatio,
}

#[derive(Debug, Clone)]
pub struct ExtendRequest {
    pub prompt: String,
    pub remote_handle: String,
    pub aspect: AspectRatio,
}

#[derive(Debug, Clone)]
pub struct BackgroundRequest {
    pub remote_handle: String,
    pub target_color: String,
}

/// The generative service as this engine sees it. Long-running edits are
/// submit-then-poll; advisory analysis calls answer in one round trip with
/// raw model text that `suggestions` parses.
#[allow(async_fn_in_trait)]
pub trait GenerationService: Send + Sync {
    fn has_credential(&self) -> bool;

    async fn submit_generation(&self, req: &GenerationRequest) -> Result<JobHandle, ServiceError>;
    async fn submit_stitch(&self, req: &StitchRequest) -> Result<JobHandle, ServiceError>;
    async fn submit_extend(&self, req: &ExtendRequest) -> Result<JobHandle, ServiceError>;
    async fn submit_background_replace(
        &self,
        req: &BackgroundRequest,
    ) -> Result<JobHandle, ServiceError>;

    async fn poll_job(&self, handle: &JobHandle) -> Result<JobPoll, ServiceError>;
    async fn fetch_artifact(&self, artifact: &RemoteArtifact) -> Result<Vec<u8>, ServiceError>;

    async fn analyze_scenes(&self, media: &[u8]) -> Result<String, ServiceError>;
    async fn generate_captions(&self, media: &[u8]) -> Result<String, ServiceError>;
    async fn suggest_color_grade(&self, media: &[u8], vibe: &str) -> Result<String, ServiceError>;
}

// --- HTTP IMPLEMENTATION ---

// Wire shapes the service sends back. Kept private; callers only ever see
// the types above.
#[derive(Deserialize, Debug)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Deserialize, Debug)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize, Debug)]
struct JobStatusResponse {
    state: String,
    error: Option<String>,
    result: Option<RemoteArtifact>,
}

#[derive(Deserialize, Debug)]
struct AnalysisResponse {
    text: String,
}

/// REST client for the hosted generation service. Constructed explicitly at
/// startup and injected wherever it is needed; there is no ambient global.
pub struct HttpGenerationService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGenerationService {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn require_credential(&self) -> Result<(), ServiceError> {
        if self.api_key.is_empty() {
            return Err(ServiceError::MissingCredential);
        }
        Ok(())
    }

    /// Media bytes go up first; job specs then reference the upload id.
    async fn upload_media(&self, bytes: &[u8]) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!("{}/v1/uploads", self.base_url))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;
        let response = check_status(response).await?;
        let upload: UploadResponse = response.json().await?;
        Ok(upload.id)
    }

    async fn submit_job(&self, body: serde_json::Value) -> Result<JobHandle, ServiceError> {
        self.require_credential()?;
        let response = self
            .client
            .post(format!("{}/v1/jobs", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let submitted: SubmitResponse = response.json().await?;
        Ok(JobHandle(submitted.job_id))
    }

    async fn analyze(
        &self,
        operation: &str,
        media: &[u8],
        extra: serde_json::Value,
    ) -> Result<String, ServiceError> {
        self.require_credential()?;
        let media_id = self.upload_media(media).await?;
        let mut body = json!({ "media_id": media_id });
        if let Some(object) = body.as_object_mut() {
            if let Some(extra_object) = extra.as_object() {
                for (key, value) in extra_object {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        let response = self
            .client
            .post(format!("{}/v1/analyze/{}", self.base_url, operation))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let analysis: AnalysisResponse = response.json().await?;
        Ok(analysis.text)
    }
}

/// Non-2xx answers become `Rejected` with whatever message body the service
/// provided, so submission failures carry a user-readable reason.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ServiceError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl GenerationService for HttpGenerationService {
    fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn submit_generation(&self, req: &GenerationRequest) -> Result<JobHandle, ServiceError> {
        self.require_credential()?;
        let reference_id = match &req.reference_image {
            Some(bytes) => Some(self.upload_media(bytes).await?),
            None => None,
        };
        self.submit_job(json!({
            "operation": "generate",
            "prompt": req.prompt,
            "aspect_ratio": req.aspect.as_str(),
            "reference_media_id": reference_id,
        }))
        .await
    }

    async fn submit_stitch(&self, req: &StitchRequest) -> Result<JobHandle, ServiceError> {
        self.require_credential()?;
        let start_id = self.upload_media(&req.start_frame).await?;
        let end_id = self.upload_media(&req.end_frame).await?;
        self.submit_job(json!({
            "operation": "stitch",
            "prompt": req.prompt,
            "aspect_ratio": req.aspect.as_str(),
            "start_frame_media_id": start_id,
            "end_frame_media_id": end_id,
        }))
        .await
    }

    async fn submit_extend(&self, req: &ExtendRequest) -> Result<JobHandle, ServiceError> {
        self.submit_job(json!({
            "operation": "extend",
            "prompt": req.prompt,
            "aspect_ratio": req.aspect.as_str(),
            "source_handle": req.remote_handle,
        }))
        .await
    }

    async fn submit_background_replace(
        &self,
        req: &BackgroundRequest,
    ) -> Result<JobHandle, ServiceError> {
        self.submit_job(json!({
            "operation": "background_replace",
            "source_handle": req.remote_handle,
            "target_color": req.target_color,
        }))
        .await
    }

    async fn poll_job(&self, handle: &JobHandle) -> Result<JobPoll, ServiceError> {
        let response = self
            .client
            .get(format!("{}/v1/jobs/{}", self.base_url, handle.0))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = check_status(response).await?;
        let status: JobStatusResponse = response.json().await?;
        Ok(match status.state.as_str() {
            "failed" => JobPoll {
                done: true,
                result: None,
                error: Some(
                    status
                        .error
                        .unwrap_or_else(|| "generation failed".to_string()),
                ),
            },
            "succeeded" => JobPoll {
                done: true,
                result: status.result,
                error: None,
            },
            _ => JobPoll::default(),
        })
    }

    async fn fetch_artifact(&self, artifact: &RemoteArtifact) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .client
            .get(&artifact.uri)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn analyze_scenes(&self, media: &[u8]) -> Result<String, ServiceError> {
        self.analyze("scenes", media, json!({})).await
    }

    async fn generate_captions(&self, media: &[u8]) -> Result<String, ServiceError> {
        self.analyze("captions", media, json!({})).await
    }

    async fn suggest_color_grade(&self, media: &[u8], vibe: &str) -> Result<String, ServiceError> {
        self.analyze("color_grade", media, json!({ "vibe": vibe })).await
    }
}
