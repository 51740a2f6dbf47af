//! Core types, errors and cancellation shared by every stage.

/// Cooperative run cancellation.
pub mod cancel;
/// Face indices, sizes, quality and rasters.
pub mod core;
/// Error taxonomy.
pub mod error;
