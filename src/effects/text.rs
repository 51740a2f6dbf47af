//! Single-line text rasterization into a cropped coverage layer.

use crate::{
    assets::font::{FontBytes, TextBrushRgba8, TextLayoutEngine},
    effects::composite::PremulLayer,
    foundation::error::{CubeError, CubeResult},
};

/// White text rendered into a layer positioned on the target.
#[derive(Clone, Debug)]
pub struct TextLayer {
    /// Premultiplied white coverage.
    pub layer: PremulLayer,
    /// Advance width of the shaped line.
    pub advance: f32,
    /// Target x of the layer's left edge.
    pub x: i32,
    /// Target y of the layer's top edge.
    pub y: i32,
}

/// Where a line sits on the target: horizontally centered on `center_x`, baseline at
/// `baseline_y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineAnchor {
    pub center_x: f32,
    pub baseline_y: f32,
}

/// Shape `text` at `size_px` and rasterize the part that can reach a `bounds` target.
///
/// The layer keeps `margin` pixels beyond the text and beyond the target edges, so an
/// offset, blurred copy is not clipped early. Text running past the target is cut off.
pub fn render_text_line(
    engine: &mut TextLayoutEngine,
    font: &FontBytes,
    text: &str,
    size_px: f32,
    anchor: LineAnchor,
    bounds: (u32, u32),
    margin: u32,
) -> CubeResult<TextLayer> {
    let white = TextBrushRgba8 {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
    let layout = engine.layout_line(text, font, size_px, white)?;

    let advance = layout.width();
    let baseline = layout
        .lines()
        .next()
        .map(|line| line.metrics().baseline)
        .unwrap_or(size_px);
    let content_h = layout.height().max(size_px * 1.2);

    let m = margin as f32;
    let pen_x = anchor.center_x - advance / 2.0;
    let line_top = anchor.baseline_y - baseline;

    let x0 = (pen_x - m).floor().max(-m);
    let x1 = (pen_x + advance + m).ceil().min(bounds.0 as f32 + m);
    let y0 = (line_top - m).floor().max(-m);
    let y1 = (line_top + content_h + m).ceil().min(bounds.1 as f32 + m);
    if x1 <= x0 || y1 <= y0 {
        return Ok(TextLayer {
            layer: PremulLayer::transparent(1, 1)?,
            advance,
            x: 0,
            y: 0,
        });
    }
    let width = layer_dim(x1 - x0)?;
    let height = layer_dim(y1 - y0)?;

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    let font_data = vello_cpu::peniko::FontData::new(
        vello_cpu::peniko::Blob::from(font.data.as_ref().clone()),
        font.index,
    );

    ctx.set_transform(vello_cpu::kurbo::Affine::translate((
        f64::from(pen_x - x0),
        f64::from(line_top - y0),
    )));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);

    let layer = PremulLayer::from_premul(
        u32::from(width),
        u32::from(height),
        pixmap.data_as_u8_slice().to_vec(),
    )?;

    Ok(TextLayer {
        layer,
        advance,
        x: x0 as i32,
        y: y0 as i32,
    })
}

fn layer_dim(v: f32) -> CubeResult<u16> {
    if !v.is_finite() || v < 1.0 || v > f32::from(u16::MAX) {
        return Err(CubeError::render(format!("text layer dimension {v} out of range")));
    }
    Ok(v as u16)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/text.rs"]
mod tests;
