use crate::foundation::core::FaceIndex;

/// Convenience alias used across the crate.
pub type CubeResult<T> = Result<T, CubeError>;

/// Error taxonomy for a cube-face run.
///
/// Upload and logo failures are non-fatal: the orchestrator logs and swallows them.
/// Every other kind aborts the active run.
#[derive(thiserror::Error, Debug)]
pub enum CubeError {
    /// The panorama (or another input image) could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Render device/context or render target allocation failed.
    #[error("render error: {0}")]
    Render(String),

    /// A face readback produced a buffer of the wrong size.
    #[error("readback error: face {face}: expected {expected} bytes, got {actual}")]
    Readback {
        /// Face that was being read back.
        face: FaceIndex,
        /// Expected byte count (`width * height * 4`).
        expected: usize,
        /// Byte count actually transferred.
        actual: usize,
    },

    /// Uploading an encoded face failed.
    #[error("upload error: {0}")]
    Upload(String),

    /// The logo asset could not be loaded.
    #[error("logo load error: {0}")]
    LogoLoad(String),

    /// Lossy encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Archive creation failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// No usable font for watermark/caption text.
    #[error("font error: {0}")]
    Font(String),

    /// Invalid configuration or input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The run was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("run cancelled")]
    Cancelled,

    /// Anything else, with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CubeError {
    /// Build a [`CubeError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`CubeError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`CubeError::Upload`].
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Build a [`CubeError::LogoLoad`].
    pub fn logo_load(msg: impl Into<String>) -> Self {
        Self::LogoLoad(msg.into())
    }

    /// Build a [`CubeError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`CubeError::Archive`].
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Build a [`CubeError::Font`].
    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font(msg.into())
    }

    /// Build a [`CubeError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error aborts the active run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Upload(_) | Self::LogoLoad(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
