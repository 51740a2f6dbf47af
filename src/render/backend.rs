use crate::{
    assets::panorama::PanoramaImage,
    foundation::{core::CubeSize, error::CubeResult},
    render::{
        projection::{CubeCamera, SkySphere},
        target::CubeRenderTarget,
    },
};

/// Renders a panorama onto the inside of a sphere and captures it into a cube target.
pub trait CubeRenderer: Send {
    /// Allocate a fresh target of `size x size` per face and render into it.
    fn render(
        &mut self,
        pano: &PanoramaImage,
        size: CubeSize,
    ) -> CubeResult<Box<dyn CubeRenderTarget>>;

    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Targets produced by this renderer that have not been dropped yet.
    fn live_targets(&self) -> usize;
}

/// Available render backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software projection (always available).
    #[default]
    Cpu,
    /// wgpu render target (requires the `gpu` feature).
    Gpu,
}

/// Scene parameters shared by all backends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    /// Cube camera clip planes.
    pub camera: CubeCamera,
    /// Sphere the panorama is textured onto.
    pub sphere: SkySphere,
    /// Color written where nothing survives clipping.
    pub clear_rgba: [u8; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            camera: CubeCamera::default(),
            sphere: SkySphere::default(),
            clear_rgba: [0, 0, 0, 255],
        }
    }
}

/// Build the renderer for `kind`.
pub fn create_renderer(
    kind: BackendKind,
    settings: &RenderSettings,
) -> CubeResult<Box<dyn CubeRenderer>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::render::cpu::CpuCubeRenderer::new(
            *settings,
        ))),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => Ok(Box::new(crate::render::gpu::GpuCubeRenderer::new(
            *settings,
        )?)),
        #[cfg(not(feature = "gpu"))]
        BackendKind::Gpu => Err(crate::foundation::error::CubeError::render(
            "gpu backend not compiled in; build with --features gpu",
        )),
    }
}
