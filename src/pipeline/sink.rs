use std::path::PathBuf;

use anyhow::Context;

use crate::{
    encode::jpeg::EncodedFace,
    foundation::{
        core::{FaceIndex, Quality},
        error::{CubeError, CubeResult},
    },
};

/// Configuration provided to a [`FaceSink`] at the start of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Face edge length in pixels.
    pub cube_size: u32,
    pub quality: Quality,
}

/// Observer of encoded faces as they complete.
///
/// Ordering contract: `publish` is called exactly once per face, in strictly increasing
/// [`FaceIndex`] order, and each call happens before the next face is published.
pub trait FaceSink: Send {
    /// Called once before any face is published.
    fn begin(&mut self, cfg: SinkConfig) -> CubeResult<()>;
    /// Receive one finished face.
    fn publish(&mut self, face: &EncodedFace) -> CubeResult<()>;
    /// Called once after face 5 is published.
    fn end(&mut self) -> CubeResult<()>;
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    faces: Vec<EncodedFace>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Faces in publish order.
    pub fn faces(&self) -> &[EncodedFace] {
        &self.faces
    }

    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FaceSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CubeResult<()> {
        self.cfg = Some(cfg);
        self.faces.clear();
        self.ended = false;
        Ok(())
    }

    fn publish(&mut self, face: &EncodedFace) -> CubeResult<()> {
        self.faces.push(face.clone());
        Ok(())
    }

    fn end(&mut self) -> CubeResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Writes `CubeFace{i}.jpeg` into a directory as each face is published.
#[derive(Debug)]
pub struct DirSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Files written so far, in publish order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FaceSink for DirSink {
    fn begin(&mut self, _cfg: SinkConfig) -> CubeResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        self.written.clear();
        Ok(())
    }

    fn publish(&mut self, face: &EncodedFace) -> CubeResult<()> {
        let path = self.dir.join(face.file_name());
        std::fs::write(&path, &face.bytes)
            .with_context(|| format!("write face '{}'", path.display()))?;
        tracing::info!(face = face.face.get(), path = %path.display(), bytes = face.bytes.len(), "face written");
        self.written.push(path);
        Ok(())
    }

    fn end(&mut self) -> CubeResult<()> {
        if self.written.len() != FaceIndex::COUNT {
            return Err(CubeError::validation(format!(
                "dir sink ended after {} of {} faces",
                self.written.len(),
                FaceIndex::COUNT
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/sink.rs"]
mod tests;
