//! Face encoding and archive export.

/// Zip export of a complete run.
pub mod archive;
/// JPEG encoding and the per-run face collection.
pub mod jpeg;
