//! Readback of render-target faces into upright rasters.

use crate::{
    foundation::{
        core::{FaceIndex, RasterRGBA, rgba8_len},
        error::{CubeError, CubeResult},
    },
    render::target::CubeRenderTarget,
};

/// Orientation fix applied to a raw face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceCorrection {
    /// Horizontal flip only.
    Mirror,
    /// Horizontal flip, then a quarter turn clockwise.
    MirrorThenRotateCw,
}

impl FaceCorrection {
    pub fn for_face(face: FaceIndex) -> Self {
        if face.is_logo_face() {
            Self::MirrorThenRotateCw
        } else {
            Self::Mirror
        }
    }
}

/// Reads faces out of a render target and corrects their orientation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaceExtractor;

impl FaceExtractor {
    /// Read `face` from `target` and return it upright at `width x height`.
    ///
    /// The transferred buffer must hold exactly `width * height * 4` bytes.
    #[tracing::instrument(level = "debug", skip(self, target), fields(face = face.get()))]
    pub fn extract(
        &self,
        target: &dyn CubeRenderTarget,
        face: FaceIndex,
        width: u32,
        height: u32,
    ) -> CubeResult<RasterRGBA> {
        let expected = rgba8_len(width, height)?;
        let raw = target.read_face_rgba8(face)?;
        if raw.len() != expected {
            return Err(CubeError::Readback {
                face,
                expected,
                actual: raw.len(),
            });
        }
        let raw = RasterRGBA::new(width, height, raw)?;
        let mirrored = mirror(&raw);
        match FaceCorrection::for_face(face) {
            FaceCorrection::Mirror => Ok(mirrored),
            FaceCorrection::MirrorThenRotateCw => Ok(rotate_cw(&mirrored)),
        }
    }
}

/// Horizontal flip: `out(x, y) = in(W-1-x, y)`.
pub fn mirror(src: &RasterRGBA) -> RasterRGBA {
    let row_bytes = src.width as usize * 4;
    let mut data = Vec::with_capacity(src.data.len());
    for row in src.data.chunks_exact(row_bytes) {
        for px in row.chunks_exact(4).rev() {
            data.extend_from_slice(px);
        }
    }
    RasterRGBA {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Quarter turn clockwise: `out(x, y) = in(y, H-1-x)`, output is `H x W`.
pub fn rotate_cw(src: &RasterRGBA) -> RasterRGBA {
    let (w, h) = (src.width as usize, src.height as usize);
    let mut data = vec![0u8; src.data.len()];
    // Output width is the source height.
    for y in 0..w {
        for x in 0..h {
            let s = ((h - 1 - x) * w + y) * 4;
            let d = (y * h + x) * 4;
            data[d..d + 4].copy_from_slice(&src.data[s..s + 4]);
        }
    }
    RasterRGBA {
        width: src.height,
        height: src.width,
        data,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/extract/face.rs"]
mod tests;
