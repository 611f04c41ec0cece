//! Restframe / observer-frame transforms and flux calibration to nJy.

use crate::cosmology::CosmologyProvider;
use crate::error::{NoiseError, Result};

/// Centimetres per megaparsec.
pub const CM_PER_MPC: f64 = 3.08e24;

/// Denominator of the erg/s/A/cm^2 -> Jy conversion with wavelength in
/// microns: F_nu[Jy] = lambda[um]^2 * F_lambda / 3e-13.
const JY_CONVERSION: f64 = 3.0e-13;

const NJY_PER_JY: f64 = 1.0e9;

const MICRON_PER_ANGSTROM: f64 = 1.0e-4;

pub fn angstrom_to_micron(wavelength: f64) -> f64 {
    wavelength * MICRON_PER_ANGSTROM
}

pub fn micron_to_angstrom(wavelength: f64) -> f64 {
    wavelength / MICRON_PER_ANGSTROM
}

/// Converts spectra between frames and into instrument units.
pub struct UnitConverter<'a> {
    cosmology: &'a dyn CosmologyProvider,
}

impl<'a> UnitConverter<'a> {
    pub fn new(cosmology: &'a dyn CosmologyProvider) -> Self {
        Self { cosmology }
    }

    /// Stretch wavelength by `1+z` and dilute flux by the same factor.
    pub fn to_observer_frame(wavelength: &[f64], flux: &[f64], z: f64) -> (Vec<f64>, Vec<f64>) {
        let zp1 = 1.0 + z;
        (
            wavelength.iter().map(|w| w * zp1).collect(),
            flux.iter().map(|f| f / zp1).collect(),
        )
    }

    /// Inverse of [`UnitConverter::to_observer_frame`].
    pub fn to_rest_frame(wavelength: &[f64], flux: &[f64], z: f64) -> (Vec<f64>, Vec<f64>) {
        let zp1 = 1.0 + z;
        (
            wavelength.iter().map(|w| w / zp1).collect(),
            flux.iter().map(|f| f * zp1).collect(),
        )
    }

    /// Factor turning a restframe flux (erg/s/A) observed at `wavelength_obs`
    /// (A) into nJy, given the luminosity distance in cm.
    fn njy_factor(wavelength_obs: f64, zp1: f64, d_l_cm: f64) -> f64 {
        let area = 4.0 * std::f64::consts::PI * d_l_cm * d_l_cm;
        let lambda_um = angstrom_to_micron(wavelength_obs);
        NJY_PER_JY * lambda_um * lambda_um / (zp1 * area * JY_CONVERSION)
    }

    /// Luminosity distance from the provider, which must be positive.
    fn luminosity_distance_cm(&self, z: f64) -> Result<f64> {
        let distance_mpc = self.cosmology.luminosity_distance_mpc(z);
        if !(distance_mpc > 0.0 && distance_mpc.is_finite()) {
            return Err(NoiseError::InvalidDistance { z, distance_mpc });
        }
        Ok(distance_mpc * CM_PER_MPC)
    }

    /// Per-sample multiplier from restframe flux (erg/s/A) to observed flux
    /// density (nJy). Observer-frame wavelengths are returned alongside.
    pub fn njy_per_unit_flux(&self, wavelength_rest: &[f64], z: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        let zp1 = 1.0 + z;
        let d_l_cm = self.luminosity_distance_cm(z)?;
        Ok(wavelength_rest
            .iter()
            .map(|&w| {
                let obs = w * zp1;
                (obs, Self::njy_factor(obs, zp1, d_l_cm))
            })
            .unzip())
    }

    /// Restframe wavelength (A) and flux (erg/s/A) to observer-frame
    /// wavelength (A) and flux density (nJy).
    pub fn flux_to_calibrated_density(
        &self,
        wavelength_rest: &[f64],
        flux_rest: &[f64],
        z: f64,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let (wavelength_obs, factors) = self.njy_per_unit_flux(wavelength_rest, z)?;
        let flux_njy = flux_rest.iter().zip(&factors).map(|(f, k)| f * k).collect();
        Ok((wavelength_obs, flux_njy))
    }
}
