use std::collections::BTreeMap;

use anyhow::Context;

use crate::foundation::{
    core::{FaceIndex, Quality, RasterRGBA},
    error::{CubeError, CubeResult},
};

/// MIME type of every encoded face.
pub const FACE_MIME: &str = "image/jpeg";

/// One compressed face, as published and uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFace {
    pub face: FaceIndex,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub caption: String,
}

impl EncodedFace {
    pub fn mime(&self) -> &'static str {
        FACE_MIME
    }

    /// File name used by the archive and directory sink.
    pub fn file_name(&self) -> String {
        format!("CubeFace{}.jpeg", self.face.get())
    }
}

/// Ordered face-index to encoded-face mapping for one run, filled one entry at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedFaces {
    faces: BTreeMap<FaceIndex, EncodedFace>,
}

impl EncodedFaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a face; a face index may only be inserted once.
    pub fn insert(&mut self, face: EncodedFace) -> CubeResult<()> {
        if self.faces.contains_key(&face.face) {
            return Err(CubeError::validation(format!(
                "face {} already encoded in this run",
                face.face
            )));
        }
        self.faces.insert(face.face, face);
        Ok(())
    }

    pub fn get(&self, face: FaceIndex) -> Option<&EncodedFace> {
        self.faces.get(&face)
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// All six faces present.
    pub fn is_complete(&self) -> bool {
        self.faces.len() == FaceIndex::COUNT
    }

    /// Faces in index order.
    pub fn iter(&self) -> impl Iterator<Item = &EncodedFace> {
        self.faces.values()
    }
}

/// Lossy JPEG encoder for composited faces.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaceEncoder;

impl FaceEncoder {
    /// JPEG quality setting (`1..=100`) for a normalized quality.
    pub fn jpeg_quality(quality: Quality) -> u8 {
        (quality.get() * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Encode `raster` as JPEG. Alpha is dropped.
    pub fn encode(&self, raster: &RasterRGBA, quality: Quality) -> CubeResult<Vec<u8>> {
        let rgba = image::RgbaImage::from_raw(raster.width, raster.height, raster.data.clone())
            .ok_or_else(|| CubeError::encode("raster buffer does not match its size"))?;
        let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut out = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut out,
            Self::jpeg_quality(quality),
        );
        rgb.write_with_encoder(encoder)
            .context("jpeg encode")
            .map_err(|e| CubeError::encode(format!("{e:#}")))?;
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/jpeg.rs"]
mod tests;
