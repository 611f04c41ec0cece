//! Luminosity distances.
//!
//! The flux calibration only needs one number from cosmology, D_L(z). It is
//! injected through [`CosmologyProvider`] so callers can plug in their own
//! model (or a stub in tests).

use serde::Deserialize;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 2.997_924_58e5;

/// Source of luminosity distances.
pub trait CosmologyProvider {
    /// Luminosity distance in Mpc at redshift `z`.
    fn luminosity_distance_mpc(&self, z: f64) -> f64;
}

impl<F> CosmologyProvider for F
where
    F: Fn(f64) -> f64,
{
    fn luminosity_distance_mpc(&self, z: f64) -> f64 {
        self(z)
    }
}

/// Flat (or nearly flat) Lambda-CDM without radiation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlatLambdaCdm {
    /// Hubble constant in km/s/Mpc.
    pub h0: f64,
    pub omega_m: f64,
    pub omega_lambda: f64,
}

impl Default for FlatLambdaCdm {
    fn default() -> Self {
        Self {
            h0: 70.0,
            omega_m: 0.27,
            omega_lambda: 0.73,
        }
    }
}

impl FlatLambdaCdm {
    // Even, so Simpson's rule applies directly.
    const STEPS: usize = 2048;

    pub fn new(h0: f64, omega_m: f64, omega_lambda: f64) -> Self {
        Self {
            h0,
            omega_m,
            omega_lambda,
        }
    }

    pub fn hubble_distance_mpc(&self) -> f64 {
        SPEED_OF_LIGHT_KM_S / self.h0
    }

    fn inverse_e(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        let omega_k = 1.0 - self.omega_m - self.omega_lambda;
        let e2 = self.omega_m * zp1.powi(3) + omega_k * zp1.powi(2) + self.omega_lambda;
        1.0 / e2.sqrt()
    }

    /// Line-of-sight comoving distance in Mpc.
    pub fn comoving_distance_mpc(&self, z: f64) -> f64 {
        if z <= 0.0 {
            return 0.0;
        }
        let h = z / Self::STEPS as f64;
        let mut sum = self.inverse_e(0.0) + self.inverse_e(z);
        for i in 1..Self::STEPS {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * self.inverse_e(i as f64 * h);
        }
        self.hubble_distance_mpc() * sum * h / 3.0
    }
}

impl CosmologyProvider for FlatLambdaCdm {
    fn luminosity_distance_mpc(&self, z: f64) -> f64 {
        (1.0 + z) * self.comoving_distance_mpc(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_vanishes_at_zero_redshift() {
        let cosmo = FlatLambdaCdm::default();
        assert_eq!(cosmo.luminosity_distance_mpc(0.0), 0.0);
    }

    #[test]
    fn low_redshift_follows_hubble_law() {
        let cosmo = FlatLambdaCdm::default();
        let z = 1e-3;
        assert_relative_eq!(
            cosmo.luminosity_distance_mpc(z),
            z * cosmo.hubble_distance_mpc(),
            max_relative = 1e-3
        );
    }

    #[test]
    fn einstein_de_sitter_has_closed_form() {
        // Omega_m = 1: D_C = 2 D_H (1 - 1/sqrt(1+z))
        let cosmo = FlatLambdaCdm::new(70.0, 1.0, 0.0);
        let z = 3.0;
        let expected = 2.0 * cosmo.hubble_distance_mpc() * (1.0 - 1.0 / (1.0_f64 + z).sqrt());
        assert_relative_eq!(cosmo.comoving_distance_mpc(z), expected, max_relative = 1e-8);
    }

    #[test]
    fn default_model_at_redshift_eight() {
        let d_l = FlatLambdaCdm::default().luminosity_distance_mpc(8.0);
        assert_relative_eq!(d_l, 83_507.0, max_relative = 1e-3);
    }

    #[test]
    fn closures_are_providers() {
        let stub = |z: f64| 1000.0 * z;
        assert_eq!(stub.luminosity_distance_mpc(2.0), 2000.0);
    }
}
