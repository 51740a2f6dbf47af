use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use rayon::prelude::*;

use crate::{
    assets::panorama::PanoramaImage,
    foundation::{core::CubeSize, error::CubeResult},
    render::{
        backend::{BackendKind, CubeRenderer, RenderSettings},
        projection::{FaceBasis, RAW_FACE_BASIS, dir_to_equirect_uv, sample_bilinear},
        target::{CpuCubeTarget, CubeRenderTarget},
    },
};

/// Software cube renderer: every texel casts a ray onto the sky sphere and samples the panorama.
pub struct CpuCubeRenderer {
    settings: RenderSettings,
    live: Arc<AtomicUsize>,
}

impl CpuCubeRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn render_face(&self, pano: &PanoramaImage, basis: &FaceBasis, size: CubeSize) -> Vec<u8> {
        let n = size.get();
        let row_bytes = n as usize * 4;
        let mut out = vec![0u8; size.face_bytes()];
        out.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let dir = basis.texel_dir(x as u32, y as u32, n);
                    let rgba = if self.settings.camera.sees(&self.settings.sphere, basis, dir) {
                        let (u, v) = dir_to_equirect_uv(dir);
                        sample_bilinear(pano, u, v)
                    } else {
                        self.settings.clear_rgba
                    };
                    px.copy_from_slice(&rgba);
                }
            });
        out
    }
}

impl CubeRenderer for CpuCubeRenderer {
    #[tracing::instrument(level = "debug", skip_all, fields(size = size.get()))]
    fn render(
        &mut self,
        pano: &PanoramaImage,
        size: CubeSize,
    ) -> CubeResult<Box<dyn CubeRenderTarget>> {
        let n = size.get();
        let faces: [Vec<u8>; 6] =
            std::array::from_fn(|i| self.render_face(pano, &RAW_FACE_BASIS[i], size));
        Ok(Box::new(CpuCubeTarget::tracked(
            n,
            faces,
            Arc::clone(&self.live),
        )))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn live_targets(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
