use std::{path::Path, sync::Arc};

use anyhow::Context;

use crate::foundation::error::{CubeError, CubeResult};

/// Families tried, in order, when no font file is configured.
const PREFERRED_FAMILIES: [&str; 4] = ["Arial", "Liberation Sans", "DejaVu Sans", "Helvetica"];

/// Font file bytes used for watermark and caption text.
#[derive(Clone)]
pub struct FontBytes {
    /// Raw font file (TTF/OTF/TTC).
    pub data: Arc<Vec<u8>>,
    /// Face index within a collection.
    pub index: u32,
}

impl std::fmt::Debug for FontBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBytes")
            .field("len", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl FontBytes {
    /// Use a specific font file.
    pub fn from_file(path: &Path) -> CubeResult<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("read font '{}'", path.display()))
            .map_err(|e| CubeError::font(format!("{e:#}")))?;
        if data.is_empty() {
            return Err(CubeError::font(format!(
                "font file '{}' is empty",
                path.display()
            )));
        }
        Ok(Self {
            data: Arc::new(data),
            index: 0,
        })
    }

    /// Pick a sans-serif face from the system font database.
    pub fn system_sans() -> CubeResult<Self> {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();

        let mut families: Vec<usvg::fontdb::Family<'_>> = PREFERRED_FAMILIES
            .iter()
            .map(|name| usvg::fontdb::Family::Name(*name))
            .collect();
        families.push(usvg::fontdb::Family::SansSerif);

        let query = usvg::fontdb::Query {
            families: &families,
            weight: usvg::fontdb::Weight::NORMAL,
            stretch: usvg::fontdb::Stretch::Normal,
            style: usvg::fontdb::Style::Normal,
        };

        let id = db
            .query(&query)
            .or_else(|| db.faces().next().map(|f| f.id))
            .ok_or_else(|| CubeError::font("no system fonts available"))?;

        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| CubeError::font("failed to read system font data"))?;

        if let Some(face) = db.face(id) {
            tracing::debug!(family = ?face.families.first().map(|f| f.0.as_str()), "resolved system font");
        }

        Ok(Self {
            data: Arc::new(data),
            index,
        })
    }

    /// Configured file if given, otherwise a system sans-serif face.
    pub fn resolve(path: Option<&Path>) -> CubeResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::system_sans(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_name: None,
        }
    }

    /// Family registered from the font bytes, once a layout has been built.
    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    /// Shape and lay out a single unwrapped line of plain text.
    pub fn layout_line(
        &mut self,
        text: &str,
        font: &FontBytes,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> CubeResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CubeError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let family_name = match &self.family_name {
            Some(name) => name.clone(),
            None => {
                let families = self.font_ctx.collection.register_fonts(
                    parley::fontique::Blob::from(font.data.as_ref().clone()),
                    None,
                );
                let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
                    CubeError::font("no font families registered from font bytes")
                })?;
                let name = self
                    .font_ctx
                    .collection
                    .family_name(family_id)
                    .ok_or_else(|| CubeError::font("registered font family has no name"))?
                    .to_string();
                self.family_name = Some(name.clone());
                name
            }
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/font.rs"]
mod tests;
