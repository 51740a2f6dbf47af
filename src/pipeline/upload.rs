//! Upload collaborator: background dispatch of published faces with bounded retry.

use std::{
    sync::{Arc, mpsc},
    thread::JoinHandle,
    time::Duration,
};

use crate::{
    encode::jpeg::EncodedFace,
    foundation::{cancel::CancelToken, core::FaceIndex, error::CubeResult},
    pipeline::config::UploadConfig,
};

/// Sends one encoded face to a remote service.
///
/// Returns the `tiles` value of the response, if any, without interpreting it.
pub trait FaceUploader: Send + Sync {
    fn upload(&self, face: &EncodedFace) -> CubeResult<Option<serde_json::Value>>;
}

/// Result of uploading one face, after retries.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadOutcome {
    pub face: FaceIndex,
    /// `tiles` from the last successful response.
    pub tiles: Option<serde_json::Value>,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Last error when every attempt failed.
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Retry schedule: `backoff * 2^(n-1)` before retry `n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor)
    }
}

impl From<&UploadConfig> for RetryPolicy {
    fn from(cfg: &UploadConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            backoff: Duration::from_millis(cfg.backoff_ms),
        }
    }
}

/// Upload `face` with retries. Failures are logged, never returned.
pub fn upload_with_retry(
    uploader: &dyn FaceUploader,
    face: &EncodedFace,
    policy: RetryPolicy,
    cancel: &CancelToken,
) -> UploadOutcome {
    let mut last_error = None;
    let mut attempts = 0;
    for attempt in 1..=policy.max_attempts.max(1) {
        if cancel.is_cancelled() {
            last_error = Some("cancelled".to_string());
            break;
        }
        if attempt > 1 {
            std::thread::sleep(policy.delay_before_retry(attempt - 1));
        }
        attempts = attempt;
        match uploader.upload(face) {
            Ok(tiles) => {
                tracing::debug!(face = face.face.get(), attempt, "face uploaded");
                return UploadOutcome {
                    face: face.face,
                    tiles,
                    attempts,
                    error: None,
                };
            }
            Err(e) => {
                tracing::warn!(face = face.face.get(), attempt, error = %e, "face upload failed");
                last_error = Some(e.to_string());
            }
        }
    }
    UploadOutcome {
        face: face.face,
        tiles: None,
        attempts,
        error: last_error,
    }
}

/// Background worker that uploads faces in the order they are dispatched.
pub(crate) struct UploadDispatcher {
    tx: Option<mpsc::Sender<EncodedFace>>,
    handle: Option<JoinHandle<Vec<UploadOutcome>>>,
}

impl UploadDispatcher {
    pub(crate) fn spawn(
        uploader: Arc<dyn FaceUploader>,
        policy: RetryPolicy,
        cancel: CancelToken,
    ) -> CubeResult<Self> {
        let (tx, rx) = mpsc::channel::<EncodedFace>();
        let handle = std::thread::Builder::new()
            .name("panocube-upload".to_string())
            .spawn(move || {
                rx.iter()
                    .map(|face| upload_with_retry(uploader.as_ref(), &face, policy, &cancel))
                    .collect()
            })
            .map_err(|e| anyhow::anyhow!("spawn upload worker: {e}"))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue a face without waiting for the upload.
    pub(crate) fn dispatch(&self, face: EncodedFace) {
        let index = face.face.get();
        let sent = self.tx.as_ref().map(|tx| tx.send(face).is_ok());
        if sent != Some(true) {
            tracing::warn!(face = index, "upload worker gone, face not uploaded");
        }
    }

    /// Stop accepting faces and wait for queued uploads to finish.
    pub(crate) fn finish(mut self) -> Vec<UploadOutcome> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Vec<UploadOutcome> {
        drop(self.tx.take());
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(outcomes)) => outcomes,
            Some(Err(_)) => {
                tracing::warn!("upload worker panicked");
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

impl Drop for UploadDispatcher {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Multipart HTTP uploader: fields `image` (`face_{i}.jpeg`) and `faceIndex`.
#[cfg(feature = "upload")]
pub struct HttpUploader {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[cfg(feature = "upload")]
impl HttpUploader {
    pub fn new(cfg: &UploadConfig) -> CubeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| crate::CubeError::upload(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: cfg.resolve_endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(feature = "upload")]
impl FaceUploader for HttpUploader {
    fn upload(&self, face: &EncodedFace) -> CubeResult<Option<serde_json::Value>> {
        use crate::CubeError;

        let index = face.face.get();
        let part = reqwest::blocking::multipart::Part::bytes(face.bytes.clone())
            .file_name(format!("face_{index}.jpeg"))
            .mime_str(face.mime())
            .map_err(|e| CubeError::upload(format!("multipart part: {e}")))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("image", part)
            .text("faceIndex", index.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    CubeError::upload(format!("timed out posting to {}", self.endpoint))
                } else {
                    CubeError::upload(format!("post to {}: {e}", self.endpoint))
                }
            })?;

        if !response.status().is_success() {
            return Err(CubeError::upload(format!(
                "server returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| CubeError::upload(format!("invalid response body: {e}")))?;
        Ok(body.get("tiles").cloned())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/upload.rs"]
mod tests;
