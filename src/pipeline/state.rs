use std::sync::Arc;

use crate::foundation::core::FaceIndex;

/// Receives every state the orchestrator enters, in order, on the thread that entered it.
pub type StateObserver = Arc<dyn Fn(PipelineState) + Send + Sync>;

/// Observable stage of the orchestrator.
///
/// A run walks `Idle -> Loading -> Rendering`, then `ExtractFace(i) -> Watermark(i) -> Encode(i)
/// -> Publish(i)` for faces 0..=5 in order, and ends in `Done`. Failures return to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    Loading,
    Rendering,
    ExtractFace(FaceIndex),
    Watermark(FaceIndex),
    Encode(FaceIndex),
    Publish(FaceIndex),
    Done,
}

impl PipelineState {
    /// Whether a run is in progress.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Done)
    }

    /// Face being processed, if any.
    pub fn face(self) -> Option<FaceIndex> {
        match self {
            Self::ExtractFace(f) | Self::Watermark(f) | Self::Encode(f) | Self::Publish(f) => {
                Some(f)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading => f.write_str("loading"),
            Self::Rendering => f.write_str("rendering"),
            Self::ExtractFace(i) => write!(f, "extract({i})"),
            Self::Watermark(i) => write!(f, "watermark({i})"),
            Self::Encode(i) => write!(f, "encode({i})"),
            Self::Publish(i) => write!(f, "publish({i})"),
            Self::Done => f.write_str("done"),
        }
    }
}
