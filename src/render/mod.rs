//! Panorama-to-cube rendering.
//!
//! A [`CubeRenderer`](backend::CubeRenderer) renders the panorama onto the inside of a sphere
//! through a cube camera into a six-face [`CubeRenderTarget`](target::CubeRenderTarget).

/// Renderer trait, backend selection and scene settings.
pub mod backend;
/// Software renderer.
pub mod cpu;
/// wgpu renderer.
#[cfg(feature = "gpu")]
pub mod gpu;
/// Cube camera and equirectangular sampling.
pub mod projection;
/// Render targets and readback.
pub mod target;
