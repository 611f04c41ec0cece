use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the rebinning and noise computations.
///
/// `Clone` so that a failed reference-table load can be cached and handed
/// back unchanged to every later caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoiseError {
    #[error("unsupported resolution mode: R={0} (expected 100 or 1000)")]
    UnsupportedResolution(u32),

    #[error("reference table not found: {}", path.display())]
    ResourceNotFound { path: PathBuf },

    #[error("malformed reference table {resource}, line {line}: {reason}")]
    MalformedResource {
        resource: String,
        line: usize,
        reason: String,
    },

    #[error("wavelength {value} is outside the interpolation range [{min}, {max}]")]
    InterpolationRange { value: f64, min: f64, max: f64 },

    #[error("wavelength has {wavelength} samples but flux has {flux}")]
    LengthMismatch { wavelength: usize, flux: usize },

    #[error("wavelengths must be strictly increasing (violated at index {index})")]
    NotAscending { index: usize },

    #[error("{column}[{index}] is not a finite number")]
    NonFiniteSample { column: &'static str, index: usize },

    #[error("spectrum contains no samples")]
    EmptySpectrum,

    #[error("signal-to-noise is zero at the normalisation wavelength {wavelength} A")]
    ZeroSignal { wavelength: f64 },

    #[error("invalid redshift: {0}")]
    InvalidRedshift(f64),

    #[error("exposure time must be positive and finite, got {0} s")]
    InvalidExposure(f64),

    #[error("target signal-to-noise must be positive and finite, got {0}")]
    InvalidTargetSn(f64),

    #[error("luminosity distance at z={z} must be positive and finite, got {distance_mpc} Mpc")]
    InvalidDistance { z: f64, distance_mpc: f64 },
}

pub type Result<T> = std::result::Result<T, NoiseError>;

/// Reject redshifts that would make `1 + z` non-positive.
pub(crate) fn check_redshift(z: f64) -> Result<()> {
    if !z.is_finite() || z <= -1.0 {
        return Err(NoiseError::InvalidRedshift(z));
    }
    Ok(())
}

/// Reject exposure times that are not a positive, finite number of seconds.
pub(crate) fn check_exposure(seconds: f64) -> Result<()> {
    if !(seconds > 0.0 && seconds.is_finite()) {
        return Err(NoiseError::InvalidExposure(seconds));
    }
    Ok(())
}
