//! Cube camera geometry and equirectangular sampling shared by the render backends.

use crate::{assets::panorama::PanoramaImage, foundation::core::FaceIndex};

/// Orthonormal view basis of one render-target face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBasis {
    /// View direction through the face center.
    pub forward: [f64; 3],
    /// Direction of increasing texel x.
    pub right: [f64; 3],
    /// Direction of decreasing texel y.
    pub up: [f64; 3],
}

/// Render-target axis convention, indexed by face (`+X, -X, +Y, -Y, +Z, -Z`).
///
/// Faces are stored mirrored, and `-Y` additionally a quarter turn counter-clockwise, so that
/// the fixed correction applied on readback yields upright faces.
pub const RAW_FACE_BASIS: [FaceBasis; 6] = [
    FaceBasis {
        forward: [1.0, 0.0, 0.0],
        right: [0.0, 0.0, -1.0],
        up: [0.0, 1.0, 0.0],
    },
    FaceBasis {
        forward: [-1.0, 0.0, 0.0],
        right: [0.0, 0.0, 1.0],
        up: [0.0, 1.0, 0.0],
    },
    FaceBasis {
        forward: [0.0, 1.0, 0.0],
        right: [-1.0, 0.0, 0.0],
        up: [0.0, 0.0, 1.0],
    },
    FaceBasis {
        forward: [0.0, -1.0, 0.0],
        right: [0.0, 0.0, -1.0],
        up: [1.0, 0.0, 0.0],
    },
    FaceBasis {
        forward: [0.0, 0.0, 1.0],
        right: [1.0, 0.0, 0.0],
        up: [0.0, 1.0, 0.0],
    },
    FaceBasis {
        forward: [0.0, 0.0, -1.0],
        right: [-1.0, 0.0, 0.0],
        up: [0.0, 1.0, 0.0],
    },
];

/// Perspective cube camera at the origin (90 degree field of view per face).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CubeCamera {
    /// Near clip distance.
    pub near: f64,
    /// Far clip distance.
    pub far: f64,
}

impl Default for CubeCamera {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Inverted sphere the panorama is mapped onto.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SkySphere {
    /// Sphere radius in scene units.
    pub radius: f64,
}

impl Default for SkySphere {
    fn default() -> Self {
        Self { radius: 500.0 }
    }
}

impl CubeCamera {
    /// Whether a sphere hit along `dir` (not normalized) survives near/far clipping for a face.
    pub fn sees(&self, sphere: &SkySphere, basis: &FaceBasis, dir: [f64; 3]) -> bool {
        let len = length(dir);
        if len <= 0.0 {
            return false;
        }
        let depth = sphere.radius * dot(dir, basis.forward) / len;
        depth >= self.near && depth <= self.far
    }
}

impl FaceBasis {
    /// Basis for `face` in the render-target convention.
    pub fn for_face(face: FaceIndex) -> &'static FaceBasis {
        &RAW_FACE_BASIS[face.as_usize()]
    }

    /// View ray through the center of texel `(x, y)` of a `size x size` face.
    pub fn texel_dir(&self, x: u32, y: u32, size: u32) -> [f64; 3] {
        let n = f64::from(size);
        let sx = 2.0 * (f64::from(x) + 0.5) / n - 1.0;
        let sy = 2.0 * (f64::from(y) + 0.5) / n - 1.0;
        [
            self.forward[0] + sx * self.right[0] - sy * self.up[0],
            self.forward[1] + sx * self.right[1] - sy * self.up[1],
            self.forward[2] + sx * self.right[2] - sy * self.up[2],
        ]
    }
}

/// Equirectangular texture coordinates `(u, v)` in `[0, 1]` for a view direction.
///
/// `-Z` maps to the panorama center; longitude grows towards `+X`.
pub fn dir_to_equirect_uv(dir: [f64; 3]) -> (f64, f64) {
    let len = length(dir).max(f64::MIN_POSITIVE);
    let lon = dir[0].atan2(-dir[2]);
    let lat = (dir[1] / len).clamp(-1.0, 1.0).asin();
    let u = 0.5 + lon / (2.0 * std::f64::consts::PI);
    let v = 0.5 - lat / std::f64::consts::PI;
    (u, v)
}

/// Bilinear sample with horizontal wrap-around and vertical clamping.
pub fn sample_bilinear(pano: &PanoramaImage, u: f64, v: f64) -> [u8; 4] {
    let w = pano.width as i64;
    let h = pano.height as i64;
    let fx = u * pano.width as f64 - 0.5;
    let fy = (v * pano.height as f64 - 0.5).clamp(0.0, (h - 1) as f64);

    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;

    let x0 = (x0 as i64).rem_euclid(w);
    let x1 = (x0 + 1).rem_euclid(w);
    let y0 = y0 as i64;
    let y1 = (y0 + 1).min(h - 1);

    let (p00, p10, p01, p11) = (
        texel(pano, x0, y0),
        texel(pano, x1, y0),
        texel(pano, x0, y1),
        texel(pano, x1, y1),
    );

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - tx) + f64::from(p10[c]) * tx;
        let bottom = f64::from(p01[c]) * (1.0 - tx) + f64::from(p11[c]) * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn texel(pano: &PanoramaImage, x: i64, y: i64) -> &[u8] {
    let idx = ((y * i64::from(pano.width) + x) as usize) * 4;
    &pano.rgba8[idx..idx + 4]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
#[path = "../../tests/unit/render/projection.rs"]
mod tests;
