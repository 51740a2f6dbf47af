//! Inputs of a run: the panorama, the logo and the overlay font.

pub mod font;
pub mod logo;
pub mod panorama;
