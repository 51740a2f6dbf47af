//! panocube turns an equirectangular panorama into six watermarked JPEG cube faces.
//!
//! - Render the panorama into a six-face cube target ([`CubeRenderer`])
//! - Read back and orient each face ([`FaceExtractor`])
//! - Draw watermark, caption and logo overlays ([`WatermarkCompositor`])
//! - Encode, publish in face order, and optionally upload and archive ([`Orchestrator`])
#![forbid(unsafe_code)]

pub mod assets;
pub mod effects;
pub mod encode;
pub mod extract;
pub mod foundation;
pub mod pipeline;
pub mod render;

pub use crate::assets::font::FontBytes;
pub use crate::assets::logo::{LogoHandle, PreparedLogo};
pub use crate::assets::panorama::PanoramaImage;
pub use crate::effects::watermark::{OverlayStyle, WatermarkCompositor, WatermarkSpec, caption_text};
pub use crate::encode::archive::{save_archive, write_archive};
pub use crate::encode::jpeg::{EncodedFace, EncodedFaces, FaceEncoder};
pub use crate::extract::face::{FaceCorrection, FaceExtractor};
pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{CubeSize, FaceIndex, Quality, RasterRGBA};
pub use crate::foundation::error::{CubeError, CubeResult};
pub use crate::pipeline::config::{PipelineConfig, UploadConfig};
pub use crate::pipeline::orchestrator::{
    Orchestrator, PanoramaSource, RunOutcome, RunReport, RunRequest,
};
pub use crate::pipeline::sink::{DirSink, FaceSink, InMemorySink, SinkConfig};
pub use crate::pipeline::state::{PipelineState, StateObserver};
#[cfg(feature = "upload")]
pub use crate::pipeline::upload::HttpUploader;
pub use crate::pipeline::upload::{FaceUploader, RetryPolicy, UploadOutcome};
pub use crate::render::backend::{BackendKind, CubeRenderer, RenderSettings, create_renderer};
pub use crate::render::cpu::CpuCubeRenderer;
#[cfg(feature = "gpu")]
pub use crate::render::gpu::GpuCubeRenderer;
pub use crate::render::target::{CpuCubeTarget, CubeRenderTarget};
