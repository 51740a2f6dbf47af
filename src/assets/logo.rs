//! Logo overlay asset: decode once per run, observe readiness at the point of use.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

use anyhow::Context;

use crate::foundation::error::{CubeError, CubeResult};

/// Decoded logo, kept in its source representation until a target size is known.
#[derive(Clone, Debug)]
pub enum PreparedLogo {
    /// Vector logo, rasterized at the exact overlay size.
    Svg(Arc<usvg::Tree>),
    /// Bitmap logo in straight RGBA8.
    Raster {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Straight RGBA8 pixels.
        rgba8: Arc<Vec<u8>>,
    },
}

impl PreparedLogo {
    /// Decode SVG (sniffed from content) or any raster format `image` supports.
    pub fn from_bytes(bytes: &[u8]) -> CubeResult<Self> {
        if looks_like_svg(bytes) {
            let opts = usvg::Options::default();
            let tree = usvg::Tree::from_data(bytes, &opts)
                .context("parse svg logo")
                .map_err(|e| CubeError::logo_load(format!("{e:#}")))?;
            return Ok(Self::Svg(Arc::new(tree)));
        }

        let img = image::load_from_memory(bytes)
            .context("decode raster logo")
            .map_err(|e| CubeError::logo_load(format!("{e:#}")))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::Raster {
            width,
            height,
            rgba8: Arc::new(img.into_raw()),
        })
    }

    /// Read and decode a logo file.
    pub fn open(path: &Path) -> CubeResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read logo '{}'", path.display()))
            .map_err(|e| CubeError::logo_load(format!("{e:#}")))?;
        Self::from_bytes(&bytes)
    }

    /// Render the logo stretched to exactly `width x height`, premultiplied RGBA8.
    pub fn rasterize_premul(&self, width: u32, height: u32) -> CubeResult<Vec<u8>> {
        if width == 0 || height == 0 {
            return Err(CubeError::validation("logo target size must be non-zero"));
        }
        match self {
            Self::Svg(tree) => rasterize_svg_to_premul_rgba8(tree, width, height),
            Self::Raster {
                width: src_w,
                height: src_h,
                rgba8,
            } => {
                let src = image::RgbaImage::from_raw(*src_w, *src_h, rgba8.as_ref().clone())
                    .ok_or_else(|| CubeError::logo_load("logo pixel buffer size mismatch"))?;
                let resized = image::imageops::resize(
                    &src,
                    width,
                    height,
                    image::imageops::FilterType::Triangle,
                );
                let mut out = resized.into_raw();
                premultiply_rgba8_in_place(&mut out);
                Ok(out)
            }
        }
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> CubeResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CubeError::logo_load("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

enum LogoState {
    Pending,
    Ready(Arc<PreparedLogo>),
    Unavailable,
}

struct LogoSlot {
    state: Mutex<LogoState>,
    settled: Condvar,
}

/// One-time logo load shared between the loader and the compositor.
///
/// Resolved exactly once. `poll` never blocks; `wait` blocks for at most the given timeout.
#[derive(Clone)]
pub struct LogoHandle {
    slot: Arc<LogoSlot>,
}

/// Write side of a pending [`LogoHandle`].
pub struct LogoResolver {
    slot: Arc<LogoSlot>,
}

impl std::fmt::Debug for LogoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*lock_state(&self.slot) {
            LogoState::Pending => "pending",
            LogoState::Ready(_) => "ready",
            LogoState::Unavailable => "unavailable",
        };
        f.debug_struct("LogoHandle").field("state", &state).finish()
    }
}

impl LogoHandle {
    /// Handle that resolves when the returned resolver is used (or dropped).
    pub fn pending() -> (Self, LogoResolver) {
        let slot = Arc::new(LogoSlot {
            state: Mutex::new(LogoState::Pending),
            settled: Condvar::new(),
        });
        (
            Self { slot: slot.clone() },
            LogoResolver { slot },
        )
    }

    /// Already-loaded logo.
    pub fn ready(logo: PreparedLogo) -> Self {
        let (handle, resolver) = Self::pending();
        resolver.resolve(Ok(logo));
        handle
    }

    /// No logo for this run.
    pub fn unavailable() -> Self {
        let (handle, resolver) = Self::pending();
        drop(resolver);
        handle
    }

    /// Start loading `path` on a worker thread.
    pub fn spawn_load(path: PathBuf) -> Self {
        let (handle, resolver) = Self::pending();
        let spawned = std::thread::Builder::new()
            .name("panocube-logo".to_string())
            .spawn(move || {
                let result = PreparedLogo::open(&path);
                resolver.resolve(result);
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "failed to spawn logo loader, logo overlay disabled");
        }
        handle
    }

    /// Non-blocking observation of the load result.
    pub fn poll(&self) -> Option<Arc<PreparedLogo>> {
        match &*lock_state(&self.slot) {
            LogoState::Ready(logo) => Some(logo.clone()),
            LogoState::Pending | LogoState::Unavailable => None,
        }
    }

    /// Wait up to `timeout` for the load to settle.
    pub fn wait(&self, timeout: Duration) -> Option<Arc<PreparedLogo>> {
        let guard = lock_state(&self.slot);
        let (guard, _) = self
            .slot
            .settled
            .wait_timeout_while(guard, timeout, |s| matches!(s, LogoState::Pending))
            .unwrap_or_else(|e| e.into_inner());
        match &*guard {
            LogoState::Ready(logo) => Some(logo.clone()),
            LogoState::Pending | LogoState::Unavailable => None,
        }
    }

    /// Whether the load has settled (successfully or not).
    pub fn is_settled(&self) -> bool {
        !matches!(&*lock_state(&self.slot), LogoState::Pending)
    }
}

impl LogoResolver {
    /// Publish the load result. Failures are logged and observed as "no logo".
    pub fn resolve(self, result: CubeResult<PreparedLogo>) {
        let next = match result {
            Ok(logo) => {
                tracing::debug!("logo loaded");
                LogoState::Ready(Arc::new(logo))
            }
            Err(e) => {
                tracing::warn!(error = %e, "logo load failed, overlay will be omitted");
                LogoState::Unavailable
            }
        };
        settle(&self.slot, next);
    }
}

impl Drop for LogoResolver {
    fn drop(&mut self) {
        let mut state = lock_state(&self.slot);
        if matches!(*state, LogoState::Pending) {
            *state = LogoState::Unavailable;
            self.slot.settled.notify_all();
        }
    }
}

fn settle(slot: &LogoSlot, next: LogoState) {
    let mut state = lock_state(slot);
    if matches!(*state, LogoState::Pending) {
        *state = next;
        slot.settled.notify_all();
    }
}

fn lock_state(slot: &LogoSlot) -> std::sync::MutexGuard<'_, LogoState> {
    slot.state.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/logo.rs"]
mod tests;
