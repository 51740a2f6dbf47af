//! Overlay compositing on extracted faces.

pub mod blur;
pub mod composite;
pub mod text;
pub mod watermark;
