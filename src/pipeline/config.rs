use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    foundation::{
        core::{CubeSize, Quality},
        error::{CubeError, CubeResult},
    },
    render::backend::BackendKind,
};

/// Upload endpoint used for local development hosts.
pub const LOCAL_UPLOAD_URL: &str = "http://localhost:5001/upload";
/// Upload endpoint used everywhere else.
pub const PRODUCTION_UPLOAD_URL: &str = "https://imgproc-server.skynav.app/upload";

/// Explicit endpoint override.
pub const UPLOAD_URL_ENV: &str = "PANOCUBE_UPLOAD_URL";
/// Host name inspected to choose between the local and production endpoints.
pub const HOST_ENV: &str = "PANOCUBE_HOST";

/// Options for one run. Every field has a default, so a partial JSON file is valid.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Face edge length in pixels.
    pub cube_size: CubeSize,
    /// Lossy encode quality in `[0, 1]`.
    pub quality: Quality,
    /// Top watermark text; empty disables it.
    pub watermark_text: String,
    /// SVG or raster logo for the nadir face.
    pub logo: Option<PathBuf>,
    /// Font file for overlay text; a system sans-serif face otherwise.
    pub font: Option<PathBuf>,
    pub backend: BackendKind,
    /// Process faces concurrently (publish order is unchanged).
    pub parallel: bool,
    /// Worker threads for parallel face processing.
    pub threads: Option<usize>,
    /// How long face 3 may wait for the logo; 0 means observe without waiting.
    pub logo_wait_ms: u64,
    pub upload: Option<UploadConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cube_size: CubeSize::default(),
            quality: Quality::default(),
            watermark_text: String::new(),
            logo: None,
            font: None,
            backend: BackendKind::Cpu,
            parallel: false,
            threads: None,
            logo_wait_ms: 0,
            upload: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> CubeResult<()> {
        CubeSize::new(self.cube_size.get())?;
        Quality::new(self.quality.get())?;
        if self.threads == Some(0) {
            return Err(CubeError::validation("threads must be >= 1 when set"));
        }
        if let Some(upload) = &self.upload {
            upload.validate()?;
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> CubeResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| CubeError::validation(format!("invalid pipeline config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> CubeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }
}

/// Upload collaborator settings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Explicit endpoint; resolved from the environment when absent.
    pub endpoint: Option<String>,
    /// Attempts per face, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_ms: u64,
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_attempts: 3,
            backoff_ms: 250,
            timeout_ms: 30_000,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> CubeResult<()> {
        if self.max_attempts == 0 {
            return Err(CubeError::validation("upload max_attempts must be >= 1"));
        }
        if self.timeout_ms == 0 {
            return Err(CubeError::validation("upload timeout_ms must be > 0"));
        }
        Ok(())
    }

    /// Endpoint from config, then `PANOCUBE_UPLOAD_URL`, then `PANOCUBE_HOST` inspection.
    pub fn resolve_endpoint(&self) -> String {
        resolve_endpoint_with(
            self.endpoint.as_deref(),
            std::env::var(UPLOAD_URL_ENV).ok().as_deref(),
            std::env::var(HOST_ENV).ok().as_deref(),
        )
    }
}

pub fn resolve_endpoint_with(
    explicit: Option<&str>,
    env_url: Option<&str>,
    host: Option<&str>,
) -> String {
    let non_blank = |u: &&str| !u.trim().is_empty();
    if let Some(url) = explicit.filter(non_blank).or(env_url.filter(non_blank)) {
        return url.trim().to_string();
    }
    endpoint_for_host(host).to_string()
}

/// Local endpoint for `localhost` (or no host), production otherwise.
pub fn endpoint_for_host(host: Option<&str>) -> &'static str {
    match host.map(str::trim) {
        None | Some("") | Some("localhost") => LOCAL_UPLOAD_URL,
        Some(h) if h.starts_with("localhost:") => LOCAL_UPLOAD_URL,
        Some(_) => PRODUCTION_UPLOAD_URL,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
