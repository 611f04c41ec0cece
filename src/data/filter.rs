use super::model::Spectrum;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Wavelength windows
// ---------------------------------------------------------------------------

/// Inclusive-or-exclusive wavelength interval `[min, max]` in Angstrom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthWindow {
    pub min: f64,
    pub max: f64,
}

impl WavelengthWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `min < x < max`.
    pub fn contains_strict(&self, x: f64) -> bool {
        x > self.min && x < self.max
    }

    /// `min <= x <= max`.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

impl From<(f64, f64)> for WavelengthWindow {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

/// Keep only the values strictly inside the window. Values lying exactly on
/// either boundary are dropped.
pub fn crop_strict(values: &[f64], window: &WavelengthWindow) -> Vec<f64> {
    values
        .iter()
        .copied()
        .filter(|&v| window.contains_strict(v))
        .collect()
}

/// Indices of samples whose wavelength lies in the (inclusive) window.
pub fn window_indices(spectrum: &Spectrum, window: &WavelengthWindow) -> Vec<usize> {
    spectrum
        .wavelength()
        .iter()
        .enumerate()
        .filter(|&(_, &w)| window.contains(w))
        .map(|(i, _)| i)
        .collect()
}

/// A new spectrum restricted to the (inclusive) window.
pub fn select_window(spectrum: &Spectrum, window: &WavelengthWindow) -> Result<Spectrum> {
    let idx = window_indices(spectrum, window);
    let wavelength = idx.iter().map(|&i| spectrum.wavelength()[i]).collect();
    let flux = idx.iter().map(|&i| spectrum.flux()[i]).collect();
    Spectrum::new(wavelength, flux)
}
