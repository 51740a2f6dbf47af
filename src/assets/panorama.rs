use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::rgba8_len;
use crate::foundation::error::{CubeError, CubeResult};

/// Decoded equirectangular source image.
///
/// Replaced wholesale for every new input; never mutated in place.
#[derive(Clone, Debug)]
pub struct PanoramaImage {
    /// Width in pixels (typically twice the height).
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Straight RGBA8, row-major, tightly packed.
    pub rgba8: Arc<Vec<u8>>,
    /// Byte size of the compressed source the pixels were decoded from.
    pub source_len: u64,
}

impl PanoramaImage {
    /// Decode any format supported by `image`, remembering the compressed size.
    pub fn decode(bytes: &[u8]) -> CubeResult<Self> {
        let dyn_img = image::load_from_memory(bytes)
            .context("decode panorama from memory")
            .map_err(|e| CubeError::decode(format!("{e:#}")))?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(CubeError::decode("panorama has zero size"));
        }
        if width != height * 2 {
            tracing::warn!(width, height, "panorama is not 2:1, faces will be distorted");
        }

        Ok(Self {
            width,
            height,
            rgba8: Arc::new(rgba.into_raw()),
            source_len: bytes.len() as u64,
        })
    }

    /// Wrap already-decoded pixels.
    pub fn from_rgba8(width: u32, height: u32, rgba8: Vec<u8>, source_len: u64) -> CubeResult<Self> {
        if width == 0 || height == 0 {
            return Err(CubeError::decode("panorama has zero size"));
        }
        let expected = rgba8_len(width, height)?;
        if rgba8.len() != expected {
            return Err(CubeError::decode(format!(
                "panorama {width}x{height} expects {expected} bytes, got {}",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8: Arc::new(rgba8),
            source_len,
        })
    }

    /// Read and decode a panorama file.
    pub fn open(path: impl AsRef<std::path::Path>) -> CubeResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("read panorama '{}'", path.display()))
            .map_err(|e| CubeError::decode(format!("{e:#}")))?;
        Self::decode(&bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/panorama.rs"]
mod tests;
