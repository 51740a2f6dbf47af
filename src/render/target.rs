use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::foundation::{core::FaceIndex, error::CubeResult};

/// Six-face offscreen render target owned by the renderer that produced it.
///
/// Dropping the target releases its memory (host or device).
pub trait CubeRenderTarget: Send + Sync {
    /// Edge length of each face in pixels.
    fn size(&self) -> u32;

    /// Transfer one face's raw RGBA8 pixels into host memory.
    fn read_face_rgba8(&self, face: FaceIndex) -> CubeResult<Vec<u8>>;
}

/// Host-memory render target produced by the CPU renderer.
pub struct CpuCubeTarget {
    size: u32,
    faces: [Vec<u8>; 6],
    live: Option<Arc<AtomicUsize>>,
}

impl CpuCubeTarget {
    /// Wrap six face buffers. Buffer lengths are not checked here; readback reports mismatches.
    pub fn from_faces(size: u32, faces: [Vec<u8>; 6]) -> Self {
        Self {
            size,
            faces,
            live: None,
        }
    }

    pub(crate) fn tracked(size: u32, faces: [Vec<u8>; 6], live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            size,
            faces,
            live: Some(live),
        }
    }
}

impl CubeRenderTarget for CpuCubeTarget {
    fn size(&self) -> u32 {
        self.size
    }

    fn read_face_rgba8(&self, face: FaceIndex) -> CubeResult<Vec<u8>> {
        Ok(self.faces[face.as_usize()].clone())
    }
}

impl Drop for CpuCubeTarget {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
