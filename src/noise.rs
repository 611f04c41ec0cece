//! Signal-to-noise estimates and Gaussian noise realizations.
//!
//! The S/N of a sample is derived from the tabulated minimum detectable flux
//! (S/N=10 at the mode's reference exposure) and scaled with exposure time
//! through an empirical power law:
//!
//! ```text
//! SN = 10 · (F_nJy / F_min) · (t / t_ref)^0.65
//! ```
//!
//! The exponent was fitted against the official NIRSpec exposure time
//! calculator.

use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::cosmology::{CosmologyProvider, FlatLambdaCdm};
use crate::data::model::{NoiseRealization, ResolutionMode, Spectrum};
use crate::error::{check_exposure, check_redshift, NoiseError, Result};
use crate::instrument::SensitivityTable;
use crate::units::{angstrom_to_micron, UnitConverter};

/// Power-law index of the S/N–exposure time relation.
pub const SN_TIME_EXPONENT: f64 = 0.65;

/// S/N reached by the tabulated minimum flux at the reference exposure.
pub const REFERENCE_SN: f64 = 10.0;

/// Exposure time used for the unscaled curve in fixed-S/N mode.
pub const NOMINAL_EXPOSURE_S: f64 = 3600.0;

/// Restframe wavelength (A) at which fixed-S/N mode pins the S/N.
pub const NORMALISATION_WAVELENGTH: f64 = 1500.0;

// ---------------------------------------------------------------------------
// GaussianSource – injected random numbers
// ---------------------------------------------------------------------------

/// Supplier of standard normal deviates.
pub trait GaussianSource {
    fn standard_normal(&mut self) -> f64;

    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }

    fn fill_standard_normal(&mut self, out: &mut [f64]) {
        for v in out {
            *v = self.standard_normal();
        }
    }
}

/// [`StandardNormal`] deviates drawn from a seedable [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededGaussian {
    rng: StdRng,
}

impl SeededGaussian {
    /// Reproducible stream for a given seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl GaussianSource for SeededGaussian {
    fn standard_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

// ---------------------------------------------------------------------------
// NoiseModel
// ---------------------------------------------------------------------------

/// Per-sample quantities shared by the S/N and noise computations.
struct Sensitivity {
    /// nJy per erg/s/A at each sample.
    njy_per_flux: Vec<f64>,
    /// Minimum detectable flux (nJy) at each sample.
    min_flux: Vec<f64>,
    /// `(t / t_ref)^0.65`
    time_scale: f64,
}

impl Sensitivity {
    fn signal_to_noise(&self, flux: &[f64]) -> Vec<f64> {
        flux.iter()
            .zip(&self.njy_per_flux)
            .zip(&self.min_flux)
            .map(|((f, k), m)| REFERENCE_SN * (f * k) / m * self.time_scale)
            .collect()
    }

    /// `flux / SN`, written so that it stays defined where the flux is zero.
    fn sigma(&self) -> Vec<f64> {
        self.njy_per_flux
            .iter()
            .zip(&self.min_flux)
            .map(|(k, m)| m / (REFERENCE_SN * k * self.time_scale))
            .collect()
    }
}

/// Computes NIRSpec S/N curves and draws noise realizations.
pub struct NoiseModel {
    table: Arc<SensitivityTable>,
    cosmology: Box<dyn CosmologyProvider + Send + Sync>,
    nominal_exposure_s: f64,
}

impl NoiseModel {
    pub fn new(
        table: Arc<SensitivityTable>,
        cosmology: impl CosmologyProvider + Send + Sync + 'static,
    ) -> Self {
        Self {
            table,
            cosmology: Box::new(cosmology),
            nominal_exposure_s: NOMINAL_EXPOSURE_S,
        }
    }

    /// Model using the packaged tables and the default cosmology.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SensitivityTable::embedded()), FlatLambdaCdm::default())
    }

    /// Override the exposure time of the unscaled fixed-S/N curve.
    pub fn with_nominal_exposure(mut self, seconds: f64) -> Self {
        self.nominal_exposure_s = seconds;
        self
    }

    pub fn table(&self) -> &Arc<SensitivityTable> {
        &self.table
    }

    fn sensitivity(
        &self,
        spectrum: &Spectrum,
        exposure_s: f64,
        z: f64,
        mode: ResolutionMode,
    ) -> Result<Sensitivity> {
        check_redshift(z)?;
        check_exposure(exposure_s)?;
        let curve = self.table.load(mode)?;
        let converter = UnitConverter::new(self.cosmology.as_ref());
        let (wavelength_obs, njy_per_flux) = converter.njy_per_unit_flux(spectrum.wavelength(), z)?;
        let wavelength_um: Vec<f64> = wavelength_obs.into_iter().map(angstrom_to_micron).collect();
        let min_flux = curve.min_detectable_flux_many(&wavelength_um)?;
        Ok(Sensitivity {
            njy_per_flux,
            min_flux,
            time_scale: (exposure_s / mode.reference_exposure_s()).powf(SN_TIME_EXPONENT),
        })
    }

    /// S/N at each sample of a restframe spectrum observed for `exposure_s`.
    pub fn signal_to_noise(
        &self,
        spectrum: &Spectrum,
        exposure_s: f64,
        z: f64,
        mode: ResolutionMode,
    ) -> Result<Vec<f64>> {
        let sens = self.sensitivity(spectrum, exposure_s, z, mode)?;
        Ok(sens.signal_to_noise(spectrum.flux()))
    }

    /// Noise standard deviation (erg/s/A) at each sample, i.e. `flux / SN`.
    pub fn noise_sigma(
        &self,
        spectrum: &Spectrum,
        exposure_s: f64,
        z: f64,
        mode: ResolutionMode,
    ) -> Result<Vec<f64>> {
        Ok(self.sensitivity(spectrum, exposure_s, z, mode)?.sigma())
    }

    /// Noise for a fixed exposure time.
    pub fn noise_for_fixed_time<G: GaussianSource + ?Sized>(
        &self,
        spectrum: &Spectrum,
        exposure_s: f64,
        z: f64,
        mode: ResolutionMode,
        rng: &mut G,
    ) -> Result<NoiseRealization> {
        let sens = self.sensitivity(spectrum, exposure_s, z, mode)?;
        let values = draw(&sens.sigma(), rng);
        Ok(NoiseRealization {
            values,
            signal_to_noise: sens.signal_to_noise(spectrum.flux()),
        })
    }

    /// Noise scaled so that the S/N at restframe 1500 A equals `target_sn`.
    ///
    /// The whole S/N curve at the nominal exposure is multiplied by one
    /// factor; the sample nearest 1500 A (first one on ties) sets it.
    pub fn noise_for_fixed_sn<G: GaussianSource + ?Sized>(
        &self,
        spectrum: &Spectrum,
        target_sn: f64,
        z: f64,
        mode: ResolutionMode,
        rng: &mut G,
    ) -> Result<NoiseRealization> {
        if !(target_sn > 0.0 && target_sn.is_finite()) {
            return Err(NoiseError::InvalidTargetSn(target_sn));
        }
        let sens = self.sensitivity(spectrum, self.nominal_exposure_s, z, mode)?;
        let idx = nearest_index(spectrum.wavelength(), NORMALISATION_WAVELENGTH)
            .ok_or(NoiseError::EmptySpectrum)?;
        let unscaled = sens.signal_to_noise(spectrum.flux());
        let reference = unscaled[idx];
        if reference == 0.0 || !reference.is_finite() {
            return Err(NoiseError::ZeroSignal {
                wavelength: spectrum.wavelength()[idx],
            });
        }
        debug!(
            "normalising S/N at {:.1} A: {reference:.3} -> {target_sn}",
            spectrum.wavelength()[idx]
        );

        let signal_to_noise = unscaled.iter().map(|sn| sn * target_sn / reference).collect();
        let factor = target_sn / reference;
        let sigma: Vec<f64> = sens.sigma().into_iter().map(|s| (s / factor).abs()).collect();
        Ok(NoiseRealization {
            values: draw(&sigma, rng),
            signal_to_noise,
        })
    }
}

fn draw<G: GaussianSource + ?Sized>(sigma: &[f64], rng: &mut G) -> Vec<f64> {
    sigma.iter().map(|&s| rng.normal(0.0, s)).collect()
}

/// Index of the value closest to `target`; the first one wins a tie.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().enumerate() {
        let d = (v - target).abs();
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Always returns one, so each draw equals its standard deviation.
    struct UnitDraws;

    impl GaussianSource for UnitDraws {
        fn standard_normal(&mut self) -> f64 {
            1.0
        }
    }

    fn restframe_spectrum(scale: f64) -> Spectrum {
        let wavelength: Vec<f64> = (0..360).map(|i| 1200.0 + 10.0 * i as f64).collect();
        let flux = wavelength
            .iter()
            .map(|w| scale * (w / 1500.0).powf(-2.0))
            .collect();
        Spectrum::new(wavelength, flux).unwrap()
    }

    #[test]
    fn sn_is_of_order_ten_for_a_bright_galaxy() {
        let model = NoiseModel::with_defaults();
        let sp = Spectrum::new(vec![2.0e4 / 8.0], vec![3.6e40]).unwrap();
        let sn = model.signal_to_noise(&sp, 1e4, 7.0, ResolutionMode::R100).unwrap();
        assert!(sn[0] > 5.0 && sn[0] < 20.0, "S/N = {}", sn[0]);
    }

    #[test]
    fn sn_scales_with_exposure_time_power_law() {
        let model = NoiseModel::with_defaults();
        let sp = restframe_spectrum(1e40);
        let short = model.signal_to_noise(&sp, 1e3, 7.0, ResolutionMode::R100).unwrap();
        let long = model.signal_to_noise(&sp, 1e5, 7.0, ResolutionMode::R100).unwrap();
        for (s, l) in short.iter().zip(&long) {
            assert_relative_eq!(l / s, 100.0_f64.powf(0.65), max_relative = 1e-12);
        }
    }

    #[test]
    fn reference_exposure_gives_tabulated_sn() {
        let model = NoiseModel::with_defaults();
        let curve = model.table().load(ResolutionMode::R1000).unwrap();
        let z = 7.0;
        let w_rest = 2.5e4 / (1.0 + z);
        let min_flux = curve.min_detectable_flux(2.5).unwrap();
        // Pick the flux whose calibrated density equals the minimum flux.
        let cosmology = FlatLambdaCdm::default();
        let converter = UnitConverter::new(&cosmology);
        let (_, k) = converter.njy_per_unit_flux(&[w_rest], z).unwrap();
        let sp = Spectrum::new(vec![w_rest], vec![min_flux / k[0]]).unwrap();
        let sn = model.signal_to_noise(&sp, 1e5, z, ResolutionMode::R1000).unwrap();
        assert_relative_eq!(sn[0], 10.0, max_relative = 1e-9);
    }

    #[test]
    fn fixed_time_noise_has_sigma_flux_over_sn() {
        let model = NoiseModel::with_defaults();
        let sp = restframe_spectrum(1e40);
        let noise = model
            .noise_for_fixed_time(&sp, 9000.0, 7.0, ResolutionMode::R100, &mut UnitDraws)
            .unwrap();
        assert_eq!(noise.len(), sp.len());
        for ((n, sn), f) in noise.values.iter().zip(&noise.signal_to_noise).zip(sp.flux()) {
            assert_relative_eq!(*n, f / sn, max_relative = 1e-9);
        }
    }

    #[test]
    fn zero_flux_gets_finite_noise() {
        let model = NoiseModel::with_defaults();
        let sp = Spectrum::new(vec![2000.0, 2100.0], vec![0.0, 1e40]).unwrap();
        let sigma = model.noise_sigma(&sp, 1e4, 7.0, ResolutionMode::R100).unwrap();
        assert!(sigma.iter().all(|s| s.is_finite() && *s > 0.0));
    }

    #[test]
    fn fixed_sn_pins_the_normalisation_sample() {
        let model = NoiseModel::with_defaults();
        for scale in [1e38, 1e40, 1e43] {
            let sp = restframe_spectrum(scale);
            let noise = model
                .noise_for_fixed_sn(&sp, 5.0, 7.0, ResolutionMode::R100, &mut SeededGaussian::seed_from_u64(1))
                .unwrap();
            let idx = nearest_index(sp.wavelength(), NORMALISATION_WAVELENGTH).unwrap();
            assert_eq!(sp.wavelength()[idx], 1500.0);
            assert_relative_eq!(noise.signal_to_noise[idx], 5.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn fixed_sn_noise_matches_scaled_curve() {
        let model = NoiseModel::with_defaults();
        let sp = restframe_spectrum(1e40);
        let noise = model
            .noise_for_fixed_sn(&sp, 5.0, 7.0, ResolutionMode::R1000, &mut UnitDraws)
            .unwrap();
        for ((n, sn), f) in noise.values.iter().zip(&noise.signal_to_noise).zip(sp.flux()) {
            assert_relative_eq!(*n, f / sn, max_relative = 1e-9);
        }
    }

    #[test]
    fn fixed_sn_needs_signal_at_the_normalisation_sample() {
        let model = NoiseModel::with_defaults();
        let sp = Spectrum::new(vec![1400.0, 1500.0, 1600.0], vec![1e40, 0.0, 1e40]).unwrap();
        let err = model
            .noise_for_fixed_sn(&sp, 5.0, 7.0, ResolutionMode::R100, &mut UnitDraws)
            .unwrap_err();
        assert_eq!(err, NoiseError::ZeroSignal { wavelength: 1500.0 });
    }

    #[test]
    fn nearest_index_prefers_the_first_tie() {
        assert_eq!(nearest_index(&[1400.0, 1600.0], 1500.0), Some(0));
        assert_eq!(nearest_index(&[1000.0, 1490.0, 1510.0], 1500.0), Some(1));
        assert_eq!(nearest_index(&[], 1500.0), None);
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let model = NoiseModel::with_defaults();
        let sp = restframe_spectrum(1e40);
        let a = model
            .noise_for_fixed_time(&sp, 9000.0, 7.0, ResolutionMode::R100, &mut SeededGaussian::seed_from_u64(7))
            .unwrap();
        let b = model
            .noise_for_fixed_time(&sp, 9000.0, 7.0, ResolutionMode::R100, &mut SeededGaussian::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_deviates_are_standard_normal() {
        let mut rng = SeededGaussian::seed_from_u64(42);
        let mut draws = vec![0.0; 20_000];
        rng.fill_standard_normal(&mut draws);
        let n = draws.len() as f64;
        let mean = draws.iter().sum::<f64>() / n;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }

    #[test]
    fn wavelengths_outside_the_table_are_rejected() {
        let model = NoiseModel::with_defaults();
        // 100 A restframe at z=1 is 0.02 um observed, far below coverage.
        let sp = Spectrum::new(vec![100.0], vec![1e40]).unwrap();
        let err = model
            .signal_to_noise(&sp, 1e4, 1.0, ResolutionMode::R100)
            .unwrap_err();
        assert!(matches!(err, NoiseError::InterpolationRange { .. }));
    }

    #[test]
    fn exposure_must_be_positive_and_finite() {
        let model = NoiseModel::with_defaults();
        let sp = restframe_spectrum(1e40);
        for t in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = model
                .noise_for_fixed_time(&sp, t, 7.0, ResolutionMode::R100, &mut UnitDraws)
                .unwrap_err();
            assert!(matches!(err, NoiseError::InvalidExposure(_)), "t = {t}: {err:?}");
        }
        let err = model.signal_to_noise(&sp, 0.0, 7.0, ResolutionMode::R100).unwrap_err();
        assert_eq!(err, NoiseError::InvalidExposure(0.0));
    }

    #[test]
    fn nominal_exposure_override_is_validated() {
        let model = NoiseModel::with_defaults().with_nominal_exposure(-1.0);
        let err = model
            .noise_for_fixed_sn(&restframe_spectrum(1e40), 5.0, 7.0, ResolutionMode::R100, &mut UnitDraws)
            .unwrap_err();
        assert_eq!(err, NoiseError::InvalidExposure(-1.0));
    }

    #[test]
    fn target_sn_must_be_positive_and_finite() {
        let model = NoiseModel::with_defaults();
        let sp = restframe_spectrum(1e40);
        for target in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = model
                .noise_for_fixed_sn(&sp, target, 7.0, ResolutionMode::R100, &mut UnitDraws)
                .unwrap_err();
            assert!(matches!(err, NoiseError::InvalidTargetSn(_)), "target = {target}: {err:?}");
        }
    }

    #[test]
    fn cosmology_returning_nan_is_an_error() {
        let model = NoiseModel::new(Arc::new(SensitivityTable::embedded()), |_: f64| f64::NAN);
        let sp = Spectrum::new(vec![2500.0], vec![1e40]).unwrap();
        let err = model.signal_to_noise(&sp, 1e4, 7.0, ResolutionMode::R100).unwrap_err();
        assert!(matches!(err, NoiseError::InvalidDistance { z, .. } if z == 7.0));
    }

    #[test]
    fn stub_cosmology_drives_the_calibration() {
        let table = Arc::new(SensitivityTable::embedded());
        let near = NoiseModel::new(table.clone(), |_: f64| 1.0e4);
        let far = NoiseModel::new(table, |_: f64| 2.0e4);
        let sp = Spectrum::new(vec![2500.0], vec![1e40]).unwrap();
        let a = near.signal_to_noise(&sp, 1e4, 7.0, ResolutionMode::R100).unwrap();
        let b = far.signal_to_noise(&sp, 1e4, 7.0, ResolutionMode::R100).unwrap();
        assert_relative_eq!(a[0] / b[0], 4.0, max_relative = 1e-12);
    }
}
