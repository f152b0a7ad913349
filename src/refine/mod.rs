//! Sub-pixel peak refinement.

pub mod quad2d;

pub use quad2d::biquadratic_offset;
