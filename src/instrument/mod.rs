//! Instrument reference data: resolving power and sensitivity curves.

pub mod interp;
pub mod sensitivity;

pub use interp::LinearInterpolator;
pub use sensitivity::{SensitivityCurve, SensitivityTable};
