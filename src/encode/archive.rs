//! Zip export of a complete run.

use std::{io::Write, path::Path};

use anyhow::Context;

use crate::{
    encode::jpeg::EncodedFaces,
    foundation::{
        core::FaceIndex,
        error::{CubeError, CubeResult},
    },
};

/// Pack all six faces into a zip with entries `CubeFace0.jpeg` .. `CubeFace5.jpeg`.
pub fn write_archive(faces: &EncodedFaces) -> CubeResult<Vec<u8>> {
    if !faces.is_complete() {
        return Err(CubeError::archive(format!(
            "archive needs exactly {} faces, have {}",
            FaceIndex::COUNT,
            faces.len()
        )));
    }

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let opts = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for face in faces.iter() {
        zip.start_file(face.file_name(), opts)
            .with_context(|| format!("start zip entry {}", face.file_name()))
            .map_err(|e| CubeError::archive(format!("{e:#}")))?;
        zip.write_all(&face.bytes)
            .with_context(|| format!("write zip entry {}", face.file_name()))
            .map_err(|e| CubeError::archive(format!("{e:#}")))?;
    }
    let cursor = zip
        .finish()
        .context("finish zip")
        .map_err(|e| CubeError::archive(format!("{e:#}")))?;
    Ok(cursor.into_inner())
}

/// [`write_archive`] to a file.
pub fn save_archive(faces: &EncodedFaces, path: &Path) -> CubeResult<()> {
    let bytes = write_archive(faces)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("write archive '{}'", path.display()))
        .map_err(|e| CubeError::archive(format!("{e:#}")))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/archive.rs"]
mod tests;
