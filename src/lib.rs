//! Rebin galaxy spectra to JWST/NIRSpec resolution and add noise
//! realizations consistent with the instrument sensitivity.
//!
//! ```text
//!  restframe spectrum
//!        │
//!        ▼
//!   SpectralBinner ◄── SensitivityTable (λ, R, F_min)
//!        │                   │
//!        ▼                   ▼
//!   rebinned spectrum ──► NoiseModel ◄── UnitConverter ◄── CosmologyProvider
//!                            │
//!                            ▼
//!                     NoiseRealization
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use nirspec_noise::{
//!     FlatLambdaCdm, NoiseModel, ResolutionMode, SeededGaussian, SensitivityTable,
//!     SpectralBinner, Spectrum,
//! };
//!
//! # fn main() -> Result<(), nirspec_noise::NoiseError> {
//! let table = Arc::new(SensitivityTable::embedded());
//! let binner = SpectralBinner::new(table.clone());
//! let model = NoiseModel::new(table, FlatLambdaCdm::default());
//!
//! let wavelength: Vec<f64> = (0..5000).map(|i| 1000.0 + i as f64).collect();
//! let flux = vec![1e40; wavelength.len()];
//! let spectrum = Spectrum::new(wavelength, flux)?;
//!
//! let rebinned = binner.rebin(&spectrum, ResolutionMode::R100, 7.0)?;
//! let mut rng = SeededGaussian::seed_from_u64(42);
//! let noise = model.noise_for_fixed_time(&rebinned, 9000.0, 7.0, ResolutionMode::R100, &mut rng)?;
//! let observed = noise.apply(&rebinned);
//! # let _ = observed;
//! # Ok(())
//! # }
//! ```

pub mod binning;
pub mod config;
pub mod cosmology;
pub mod data;
pub mod error;
pub mod instrument;
pub mod noise;
pub mod units;

pub use binning::{BinEdges, SpectralBinner};
pub use cosmology::{CosmologyProvider, FlatLambdaCdm};
pub use data::filter::WavelengthWindow;
pub use data::model::{NoiseRealization, ResolutionMode, Spectrum};
pub use error::NoiseError;
pub use instrument::{SensitivityCurve, SensitivityTable};
pub use noise::{GaussianSource, NoiseModel, SeededGaussian};
pub use units::UnitConverter;
