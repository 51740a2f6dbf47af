use crate::foundation::{
    core::{RasterRGBA, rgba8_len},
    error::{CubeError, CubeResult},
};

pub type PremulRgba8 = [u8; 4];

/// Premultiplied RGBA8 layer placed onto a face raster at an integer offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PremulLayer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PremulLayer {
    /// Fully transparent layer.
    pub fn transparent(width: u32, height: u32) -> CubeResult<Self> {
        Ok(Self {
            width,
            height,
            data: vec![0u8; rgba8_len(width, height)?],
        })
    }

    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> CubeResult<Self> {
        let expected = rgba8_len(width, height)?;
        if data.len() != expected {
            return Err(CubeError::validation(format!(
                "layer {width}x{height} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Replace color with `rgb` while keeping coverage (alpha).
    pub fn tinted(&self, rgb: [u8; 3]) -> Self {
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            px[0] = mul_div255(u16::from(rgb[0]), a);
            px[1] = mul_div255(u16::from(rgb[1]), a);
            px[2] = mul_div255(u16::from(rgb[2]), a);
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Whether any pixel has non-zero coverage.
    pub fn is_empty(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }
}

pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite `layer` over a straight-alpha raster with its top-left corner at `(x, y)`.
///
/// Parts of the layer that fall outside the raster are clipped.
pub fn composite_layer(dst: &mut RasterRGBA, layer: &PremulLayer, x: i32, y: i32, opacity: f32) {
    let (dw, dh) = (dst.width as i64, dst.height as i64);
    for ly in 0..layer.height as i64 {
        let ty = i64::from(y) + ly;
        if ty < 0 || ty >= dh {
            continue;
        }
        for lx in 0..layer.width as i64 {
            let tx = i64::from(x) + lx;
            if tx < 0 || tx >= dw {
                continue;
            }
            let si = ((ly * layer.width as i64 + lx) * 4) as usize;
            let src = [
                layer.data[si],
                layer.data[si + 1],
                layer.data[si + 2],
                layer.data[si + 3],
            ];
            if src[3] == 0 {
                continue;
            }
            let di = ((ty * dw + tx) * 4) as usize;
            let d = &mut dst.data[di..di + 4];
            let out = over(premultiply([d[0], d[1], d[2], d[3]]), src, opacity);
            d.copy_from_slice(&unpremultiply(out));
        }
    }
}

pub fn premultiply(px: [u8; 4]) -> PremulRgba8 {
    let a = u16::from(px[3]);
    [
        mul_div255(u16::from(px[0]), a),
        mul_div255(u16::from(px[1]), a),
        mul_div255(u16::from(px[2]), a),
        px[3],
    ]
}

pub fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    if a == 255 {
        return px;
    }
    let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), px[3]]
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
