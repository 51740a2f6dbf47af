//! Watermark, caption and logo overlays applied to corrected faces.

use crate::{
    assets::{
        font::{FontBytes, TextLayoutEngine},
        logo::PreparedLogo,
    },
    effects::{
        blur::{blur_premul, radius_for_sigma},
        composite::{PremulLayer, composite_layer},
        text::{LineAnchor, render_text_line},
    },
    foundation::{
        core::{FaceIndex, Quality, RasterRGBA},
        error::CubeResult,
    },
};

/// Paint shared by the watermark and the caption.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Opacity of the white text fill.
    pub fill_opacity: f32,
    /// Opacity of the black shadow, multiplied by the fill opacity.
    pub shadow_opacity: f32,
    /// Shadow blur amount; the Gaussian sigma is half of it.
    pub shadow_blur: f32,
    /// Shadow offset in pixels.
    pub shadow_offset: (i32, i32),
    /// Caption baseline distance from the bottom edge.
    pub caption_bottom_px: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill_opacity: 0.75,
            shadow_opacity: 0.5,
            shadow_blur: 7.0,
            shadow_offset: (3, 3),
            caption_bottom_px: 5.0,
        }
    }
}

impl OverlayStyle {
    fn shadow_sigma(&self) -> f32 {
        self.shadow_blur / 2.0
    }
}

/// Per-run overlay inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct WatermarkSpec {
    /// Top watermark text; empty disables it.
    pub text: String,
    /// Encode quality printed in the caption.
    pub quality: Quality,
    /// Compressed byte size of the source panorama.
    pub source_len: u64,
}

/// `"{w}x{h} | {kb}KB | Quality: {pct}% | Type: jpeg"`.
///
/// The size is that of the source panorama, so every face of a run shows the same figure.
pub fn caption_text(width: u32, height: u32, source_len: u64, quality: Quality) -> String {
    format!(
        "{width}x{height} | {}KB | Quality: {}% | Type: jpeg",
        kib_two_places(source_len),
        quality.percent()
    )
}

/// `bytes / 1024` with two decimals, exact halves rounded up.
pub fn kib_two_places(bytes: u64) -> String {
    let hundredths = (u128::from(bytes) * 100 + 512) / 1024;
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

/// Draws the overlays onto one face at a time. Holds no per-face state, so faces may be
/// composited concurrently.
#[derive(Clone, Debug)]
pub struct WatermarkCompositor {
    font: FontBytes,
    style: OverlayStyle,
}

impl WatermarkCompositor {
    pub fn new(font: FontBytes) -> Self {
        Self {
            font,
            style: OverlayStyle::default(),
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Apply the top watermark (not on the logo face), the caption, and the logo (logo face
    /// only, when `logo` is available).
    #[tracing::instrument(level = "debug", skip_all, fields(face = face.get()))]
    pub fn composite(
        &self,
        raster: &mut RasterRGBA,
        face: FaceIndex,
        spec: &WatermarkSpec,
        logo: Option<&PreparedLogo>,
    ) -> CubeResult<()> {
        let w = raster.width as f32;
        let h = raster.height as f32;
        let margin = radius_for_sigma(self.style.shadow_sigma())
            + self.style.shadow_offset.0.unsigned_abs().max(self.style.shadow_offset.1.unsigned_abs());
        let bounds = (raster.width, raster.height);
        let mut engine = TextLayoutEngine::new();

        if !spec.text.is_empty() && !face.is_logo_face() {
            let size = font_size(w, 10.0);
            let anchor = LineAnchor {
                center_x: w / 2.0,
                baseline_y: h / 2.0,
            };
            let text =
                render_text_line(&mut engine, &self.font, &spec.text, size, anchor, bounds, margin)?;
            self.draw_with_shadow(raster, &text.layer, text.x, text.y, self.style.fill_opacity)?;
        }

        let caption = caption_text(raster.width, raster.height, spec.source_len, spec.quality);
        let size = font_size(w, 40.0);
        let anchor = LineAnchor {
            center_x: w / 2.0,
            baseline_y: h - self.style.caption_bottom_px,
        };
        let text = render_text_line(&mut engine, &self.font, &caption, size, anchor, bounds, margin)?;
        self.draw_with_shadow(raster, &text.layer, text.x, text.y, self.style.fill_opacity)?;

        if face.is_logo_face()
            && let Some(logo) = logo
        {
            self.draw_logo(raster, logo)?;
        }
        Ok(())
    }

    fn draw_logo(&self, raster: &mut RasterRGBA, logo: &PreparedLogo) -> CubeResult<()> {
        let lw = ((raster.width as f32) / 4.0).round().max(1.0) as u32;
        let lh = ((raster.height as f32) / 4.0).round().max(1.0) as u32;
        let pixels = match logo.rasterize_premul(lw, lh) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "logo rasterization failed, overlay omitted");
                return Ok(());
            }
        };

        // Pad so the shadow is not clipped by the logo bounds.
        let pad = radius_for_sigma(self.style.shadow_sigma());
        let mut layer = PremulLayer::transparent(lw + 2 * pad, lh + 2 * pad)?;
        let row = lw as usize * 4;
        let padded_row = layer.width as usize * 4;
        for (y, src) in pixels.chunks_exact(row).enumerate() {
            let start = (y + pad as usize) * padded_row + pad as usize * 4;
            layer.data[start..start + row].copy_from_slice(src);
        }

        let x = (raster.width as f32 / 2.0 - lw as f32 / 2.0).round() as i32 - pad as i32;
        let y = (raster.height as f32 / 2.0 - lh as f32 / 2.0).round() as i32 - pad as i32;
        self.draw_with_shadow(raster, &layer, x, y, 1.0)
    }

    fn draw_with_shadow(
        &self,
        raster: &mut RasterRGBA,
        layer: &PremulLayer,
        x: i32,
        y: i32,
        fill_opacity: f32,
    ) -> CubeResult<()> {
        if layer.is_empty() {
            return Ok(());
        }
        let shadow = blur_premul(&layer.tinted([0, 0, 0]), self.style.shadow_sigma())?;
        let (dx, dy) = self.style.shadow_offset;
        composite_layer(
            raster,
            &shadow,
            x + dx,
            y + dy,
            self.style.shadow_opacity * fill_opacity,
        );
        composite_layer(raster, layer, x, y, fill_opacity);
        Ok(())
    }
}

fn font_size(width: f32, divisor: f32) -> f32 {
    (width / divisor).round().max(1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/watermark.rs"]
mod tests;
