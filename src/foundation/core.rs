use crate::foundation::error::{CubeError, CubeResult};

/// Index of one cube face, always in `0..=5`.
///
/// Faces follow the render target's order: `+X, -X, +Y, -Y, +Z, -Z`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct FaceIndex(u8);

impl FaceIndex {
    /// Number of faces in a cube.
    pub const COUNT: usize = 6;

    /// The face reserved for the logo overlay (never receives the top watermark).
    pub const LOGO: FaceIndex = FaceIndex(3);

    /// All faces in publish order.
    pub const ALL: [FaceIndex; 6] = [
        FaceIndex(0),
        FaceIndex(1),
        FaceIndex(2),
        FaceIndex(3),
        FaceIndex(4),
        FaceIndex(5),
    ];

    /// Checked constructor.
    pub fn new(index: u8) -> CubeResult<Self> {
        if usize::from(index) >= Self::COUNT {
            return Err(CubeError::validation(format!(
                "face index must be in 0..=5, got {index}"
            )));
        }
        Ok(Self(index))
    }

    /// Raw index value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Index as `usize` for table lookups.
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    /// Whether this is the distinguished logo face.
    pub fn is_logo_face(self) -> bool {
        self == Self::LOGO
    }
}

impl TryFrom<u8> for FaceIndex {
    type Error = CubeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FaceIndex> for u8 {
    fn from(value: FaceIndex) -> Self {
        value.0
    }
}

impl std::fmt::Display for FaceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output face resolution in pixels (faces are square).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CubeSize(u32);

impl CubeSize {
    /// Sizes offered by the interactive front-end.
    pub const PRESETS: [u32; 3] = [1024, 2048, 4096];

    /// Largest accepted face size.
    pub const MAX: u32 = 16_384;

    /// Checked constructor: `1..=MAX`.
    pub fn new(px: u32) -> CubeResult<Self> {
        if px == 0 || px > Self::MAX {
            return Err(CubeError::validation(format!(
                "cube size must be in 1..={}, got {px}",
                Self::MAX
            )));
        }
        Ok(Self(px))
    }

    /// Edge length in pixels.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether this is one of [`CubeSize::PRESETS`].
    pub fn is_preset(self) -> bool {
        Self::PRESETS.contains(&self.0)
    }

    /// Byte length of one RGBA8 face.
    pub fn face_bytes(self) -> usize {
        (self.0 as usize) * (self.0 as usize) * 4
    }
}

impl Default for CubeSize {
    fn default() -> Self {
        Self(4096)
    }
}

impl TryFrom<u32> for CubeSize {
    type Error = CubeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CubeSize> for u32 {
    fn from(value: CubeSize) -> Self {
        value.0
    }
}

/// Lossy encode quality, clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    /// Highest quality.
    pub const MAX: Quality = Quality(1.0);

    /// Clamp a finite value into `[0, 1]`; non-finite values are rejected.
    pub fn new(q: f32) -> CubeResult<Self> {
        if !q.is_finite() {
            return Err(CubeError::validation("quality must be finite"));
        }
        Ok(Self(q.clamp(0.0, 1.0)))
    }

    /// Value in `[0, 1]`.
    pub fn get(self) -> f32 {
        self.0
    }

    /// Rounded percentage, as printed in the caption.
    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<f32> for Quality {
    type Error = CubeError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(value: Quality) -> Self {
        value.0
    }
}

/// Straight-alpha RGBA8 raster, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl RasterRGBA {
    /// Wrap pixel bytes, validating the length.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> CubeResult<Self> {
        let expected = rgba8_len(width, height)?;
        if data.len() != expected {
            return Err(CubeError::validation(format!(
                "raster {width}x{height} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Raster filled with a single straight RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> CubeResult<Self> {
        let len = rgba8_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: rgba.repeat(len / 4),
        })
    }

    /// Pixel at `(x, y)`; panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// `width * height * 4` with overflow checking.
pub fn rgba8_len(width: u32, height: u32) -> CubeResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CubeError::validation("rgba8 buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
