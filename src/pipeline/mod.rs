//! Run orchestration and its external collaborators.

pub mod config;
pub mod orchestrator;
/// Publish targets for finished faces.
pub mod sink;
pub mod state;
pub mod upload;
