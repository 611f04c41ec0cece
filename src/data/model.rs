use std::fmt;

use crate::error::{NoiseError, Result};

// ---------------------------------------------------------------------------
// ResolutionMode – which reference table governs binning and sensitivity
// ---------------------------------------------------------------------------

/// NIRSpec resolution mode. Only R=100 (prism) and R=1000 (gratings) exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolutionMode {
    R100,
    R1000,
}

impl ResolutionMode {
    pub const ALL: [ResolutionMode; 2] = [ResolutionMode::R100, ResolutionMode::R1000];

    /// Nominal resolving power, as used on the command line.
    pub fn value(self) -> u32 {
        match self {
            ResolutionMode::R100 => 100,
            ResolutionMode::R1000 => 1000,
        }
    }

    /// Exposure time (s) at which the tabulated minimum flux gives S/N=10.
    pub fn reference_exposure_s(self) -> f64 {
        match self {
            ResolutionMode::R100 => 1.0e4,
            ResolutionMode::R1000 => 1.0e5,
        }
    }

    /// File name of the packaged sensitivity table.
    pub fn resource_name(self) -> &'static str {
        match self {
            ResolutionMode::R100 => "nirspec_sensitivity_R100.dat",
            ResolutionMode::R1000 => "nirspec_sensitivity_R1000.dat",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ResolutionMode::R100 => 0,
            ResolutionMode::R1000 => 1,
        }
    }
}

impl TryFrom<u32> for ResolutionMode {
    type Error = NoiseError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            100 => Ok(ResolutionMode::R100),
            1000 => Ok(ResolutionMode::R1000),
            other => Err(NoiseError::UnsupportedResolution(other)),
        }
    }
}

impl From<ResolutionMode> for u32 {
    fn from(mode: ResolutionMode) -> Self {
        mode.value()
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R={}", self.value())
    }
}

// ---------------------------------------------------------------------------
// Spectrum – paired wavelength / flux samples
// ---------------------------------------------------------------------------

/// A 1-D spectrum: wavelength (A) and flux (erg/s/A), strictly increasing in
/// wavelength. All samples share one reference frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
}

impl Spectrum {
    /// Validate and build a spectrum.
    pub fn new(wavelength: Vec<f64>, flux: Vec<f64>) -> Result<Self> {
        if wavelength.len() != flux.len() {
            return Err(NoiseError::LengthMismatch {
                wavelength: wavelength.len(),
                flux: flux.len(),
            });
        }
        for (column, values) in [("wavelength", &wavelength), ("flux", &flux)] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(NoiseError::NonFiniteSample { column, index });
            }
        }
        if let Some(i) = wavelength.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(NoiseError::NotAscending { index: i + 1 });
        }
        Ok(Spectrum { wavelength, flux })
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// `(min, max)` wavelength, or `None` for an empty spectrum.
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.wavelength.first(), self.wavelength.last()) {
            (Some(&lo), Some(&hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    /// Iterate over `(wavelength, flux)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.wavelength.iter().copied().zip(self.flux.iter().copied())
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.wavelength, self.flux)
    }
}

// ---------------------------------------------------------------------------
// NoiseRealization – one Gaussian draw per sample
// ---------------------------------------------------------------------------

/// Additive noise for a spectrum, together with the S/N curve it was drawn
/// from. `values[i]` perturbs the flux at sample `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseRealization {
    pub values: Vec<f64>,
    pub signal_to_noise: Vec<f64>,
}

impl NoiseRealization {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flux with the noise added, sample by sample.
    pub fn apply(&self, spectrum: &Spectrum) -> Vec<f64> {
        spectrum
            .flux()
            .iter()
            .zip(&self.values)
            .map(|(f, n)| f + n)
            .collect()
    }
}
