//! TOML configuration file support.
//!
//! Settings shared by every subcommand can live in a config file instead of
//! being repeated on the command line:
//!
//! ```toml
//! # nirspec-noise.toml
//! [cosmology]
//! h0 = 70.0
//! omega_m = 0.27
//! omega_lambda = 0.73
//!
//! [instrument]
//! resource_dir = "tables/"
//!
//! [noise]
//! seed = 42
//! nominal_exposure_s = 3600.0
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::binning::SpectralBinner;
use crate::cosmology::FlatLambdaCdm;
use crate::instrument::SensitivityTable;
use crate::noise::{NoiseModel, SeededGaussian};

/// Root configuration structure for nirspec-noise.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cosmology: FlatLambdaCdm,

    #[serde(default)]
    pub instrument: InstrumentConfig,

    #[serde(default)]
    pub noise: NoiseConfig,
}

/// Where the reference tables come from.
#[derive(Debug, Default, Deserialize)]
pub struct InstrumentConfig {
    /// Directory holding `nirspec_sensitivity_R{100,1000}.dat`. The tables
    /// packaged with the crate are used when unset.
    pub resource_dir: Option<PathBuf>,
}

/// Noise generation settings.
#[derive(Debug, Default, Deserialize)]
pub struct NoiseConfig {
    /// Seed for reproducible realizations.
    pub seed: Option<u64>,

    /// Exposure time of the unscaled curve in fixed-S/N mode.
    pub nominal_exposure_s: Option<f64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    pub fn sensitivity_table(&self) -> SensitivityTable {
        match &self.instrument.resource_dir {
            Some(dir) => SensitivityTable::from_dir(dir),
            None => SensitivityTable::embedded(),
        }
    }

    /// Binner and noise model sharing one table cache.
    pub fn build(&self) -> (SpectralBinner, NoiseModel) {
        let table = Arc::new(self.sensitivity_table());
        let mut model = NoiseModel::new(table.clone(), self.cosmology);
        if let Some(t) = self.noise.nominal_exposure_s {
            model = model.with_nominal_exposure(t);
        }
        (SpectralBinner::new(table), model)
    }

    /// Random source, seeded when the config (or `seed`) asks for it.
    pub fn gaussian_source(&self, seed: Option<u64>) -> SeededGaussian {
        match seed.or(self.noise.seed) {
            Some(seed) => SeededGaussian::seed_from_u64(seed),
            None => SeededGaussian::from_entropy(),
        }
    }
}
