//! Variable-width rebinning onto the NIRSpec wavelength grid.
//!
//! ```text
//!  sensitivity table (um, R)
//!        │  step by λ / R(λ)
//!        ▼
//!   bin edges (um) ──► Angstrom ──► restframe (÷ 1+z) ──► crop to range
//!        │
//!        ▼
//!   rebin: mean of samples per bin, empty bins backfilled by
//!          interpolating the input spectrum at the bin midpoint
//! ```

use std::sync::Arc;

use log::{debug, warn};

use crate::data::filter::{crop_strict, WavelengthWindow};
use crate::data::model::{ResolutionMode, Spectrum};
use crate::error::{check_redshift, NoiseError, Result};
use crate::instrument::{LinearInterpolator, SensitivityTable};
use crate::units::micron_to_angstrom;

// ---------------------------------------------------------------------------
// BinEdges
// ---------------------------------------------------------------------------

/// Strictly increasing bin boundaries in Angstrom.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of bins (one fewer than the edges).
    pub fn bin_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn midpoints(&self) -> Vec<f64> {
        self.0.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }

    /// Bin holding `x`, with right-open bins `[edge_i, edge_i+1)`.
    pub fn locate(&self, x: f64) -> Option<usize> {
        let k = self.0.partition_point(|&e| e <= x);
        if k >= 1 && k < self.0.len() {
            Some(k - 1)
        } else {
            None
        }
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// SpectralBinner
// ---------------------------------------------------------------------------

/// Computes NIRSpec bin edges and rebins spectra onto them.
#[derive(Debug, Clone)]
pub struct SpectralBinner {
    table: Arc<SensitivityTable>,
}

impl SpectralBinner {
    pub fn new(table: Arc<SensitivityTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<SensitivityTable> {
        &self.table
    }

    /// Bin edges in Angstrom for `mode`.
    ///
    /// Edges start at the shortest tabulated wavelength and step by
    /// `λ / R(λ)` until they pass the longest one. With `z`, edges are
    /// shifted to the restframe of the object. With `restframe_range`,
    /// only edges strictly inside the range are kept.
    pub fn compute_bin_edges(
        &self,
        mode: ResolutionMode,
        z: Option<f64>,
        restframe_range: Option<WavelengthWindow>,
    ) -> Result<BinEdges> {
        if let Some(z) = z {
            check_redshift(z)?;
        }
        let curve = self.table.load(mode)?;
        let (start, stop) = curve.coverage_um();

        let mut edges_um = vec![start];
        let mut current = start;
        while current < stop {
            current += current / curve.resolving_power(current)?;
            edges_um.push(current);
        }

        let scale = match z {
            Some(z) => micron_to_angstrom(1.0) / (1.0 + z),
            None => micron_to_angstrom(1.0),
        };
        let mut edges: Vec<f64> = edges_um.into_iter().map(|e| e * scale).collect();

        if let Some(window) = restframe_range {
            edges = crop_strict(&edges, &window);
        }
        debug!("{mode}: {} bin edges (z={z:?})", edges.len());
        Ok(BinEdges(edges))
    }

    /// Rebin a restframe spectrum at redshift `z` onto the `mode` grid.
    ///
    /// Each output bin takes the mean flux of the input samples falling in
    /// it. Bins without samples are filled by linear interpolation of the
    /// input at the bin midpoint.
    pub fn rebin(&self, spectrum: &Spectrum, mode: ResolutionMode, z: f64) -> Result<Spectrum> {
        let (lo, hi) = spectrum.span().ok_or(NoiseError::EmptySpectrum)?;
        let edges = self.compute_bin_edges(mode, Some(z), Some(WavelengthWindow::new(lo, hi)))?;
        if edges.bin_count() == 0 {
            warn!(
                "spectrum {lo:.1}-{hi:.1} A at z={z} does not span a full {mode} bin"
            );
            return Ok(Spectrum::default());
        }

        let n_bins = edges.bin_count();
        let mut sums = vec![0.0; n_bins];
        let mut counts = vec![0usize; n_bins];
        for (w, f) in spectrum.iter() {
            if let Some(bin) = edges.locate(w) {
                sums[bin] += f;
                counts[bin] += 1;
            }
        }

        let midpoints = edges.midpoints();
        let input = LinearInterpolator::new(spectrum.wavelength(), spectrum.flux())?;
        let mut backfilled = 0usize;
        let flux = sums
            .iter()
            .zip(&counts)
            .zip(&midpoints)
            .map(|((&sum, &count), &mid)| {
                if count > 0 {
                    Ok(sum / count as f64)
                } else {
                    backfilled += 1;
                    input.at(mid)
                }
            })
            .collect::<Result<Vec<f64>>>()?;

        if backfilled > 0 {
            debug!("{mode}: {backfilled} of {n_bins} bins backfilled by interpolation");
        }
        Spectrum::new(midpoints, flux)
    }
}
