use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::OnceCell;

use super::interp::LinearInterpolator;
use crate::data::model::ResolutionMode;
use crate::error::{NoiseError, Result};

const R100_TABLE: &str = include_str!("../../resources/nirspec_sensitivity_R100.dat");
const R1000_TABLE: &str = include_str!("../../resources/nirspec_sensitivity_R1000.dat");

// ---------------------------------------------------------------------------
// SensitivityCurve – one parsed reference table
// ---------------------------------------------------------------------------

/// Resolving power and minimum detectable flux against observer-frame
/// wavelength for one resolution mode.
///
/// The minimum flux is the flux density (nJy) reaching S/N=10 at the mode's
/// reference exposure time.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityCurve {
    mode: ResolutionMode,
    wavelength_um: Vec<f64>,
    resolving_power: Vec<f64>,
    min_flux_njy: Vec<f64>,
}

impl SensitivityCurve {
    /// Parse a whitespace-delimited table with columns
    /// `[wavelength_um, R, min_flux_nJy, ...]`. Blank lines and `#` comments
    /// are skipped; extra columns are ignored.
    pub fn parse(mode: ResolutionMode, resource: &str, text: &str) -> Result<Self> {
        let malformed = |line: usize, reason: String| NoiseError::MalformedResource {
            resource: resource.to_string(),
            line,
            reason,
        };

        let mut wavelength_um = Vec::new();
        let mut resolving_power = Vec::new();
        let mut min_flux_njy = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cols = line
                .split_whitespace()
                .take(3)
                .map(|tok| {
                    tok.parse::<f64>()
                        .map_err(|_| malformed(line_no, format!("'{tok}' is not a number")))
                })
                .collect::<Result<Vec<f64>>>()?;
            if cols.len() < 3 {
                return Err(malformed(
                    line_no,
                    format!("expected at least 3 columns, found {}", cols.len()),
                ));
            }
            if let Some(&prev) = wavelength_um.last() {
                if !(cols[0] > prev) {
                    return Err(malformed(line_no, "wavelengths must be strictly increasing".into()));
                }
            }
            if !(cols[1] > 0.0 && cols[1].is_finite()) {
                return Err(malformed(line_no, format!("resolving power {} must be positive", cols[1])));
            }
            if !(cols[2] > 0.0 && cols[2].is_finite()) {
                return Err(malformed(line_no, format!("minimum flux {} must be positive", cols[2])));
            }
            wavelength_um.push(cols[0]);
            resolving_power.push(cols[1]);
            min_flux_njy.push(cols[2]);
        }

        if wavelength_um.len() < 2 {
            return Err(malformed(0, "table needs at least two rows".into()));
        }

        Ok(Self {
            mode,
            wavelength_um,
            resolving_power,
            min_flux_njy,
        })
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.wavelength_um.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength_um.is_empty()
    }

    /// Covered observer-frame wavelength range in microns.
    pub fn coverage_um(&self) -> (f64, f64) {
        (self.wavelength_um[0], self.wavelength_um[self.wavelength_um.len() - 1])
    }

    pub fn wavelength_um(&self) -> &[f64] {
        &self.wavelength_um
    }

    pub fn resolving_power_column(&self) -> &[f64] {
        &self.resolving_power
    }

    pub fn min_flux_column(&self) -> &[f64] {
        &self.min_flux_njy
    }

    fn interpolator<'a>(&'a self, ys: &'a [f64]) -> LinearInterpolator<'a> {
        // Columns were validated in `parse`.
        LinearInterpolator::new_unchecked(&self.wavelength_um, ys)
    }

    /// Resolving power at an observer-frame wavelength (um).
    pub fn resolving_power(&self, wavelength_um: f64) -> Result<f64> {
        self.interpolator(&self.resolving_power).at(wavelength_um)
    }

    /// Minimum detectable flux (nJy) at an observer-frame wavelength (um).
    pub fn min_detectable_flux(&self, wavelength_um: f64) -> Result<f64> {
        self.interpolator(&self.min_flux_njy).at(wavelength_um)
    }

    pub fn min_detectable_flux_many(&self, wavelength_um: &[f64]) -> Result<Vec<f64>> {
        self.interpolator(&self.min_flux_njy).at_many(wavelength_um)
    }
}

// ---------------------------------------------------------------------------
// SensitivityTable – lazily loaded, per-mode cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum TableSource {
    Embedded,
    Directory(PathBuf),
}

/// Lazily loads and caches the reference curve of each resolution mode.
///
/// Each mode is loaded at most once, and concurrent first accesses block on
/// the same initialisation. A failed load is cached as well, so every later
/// request for that mode returns the same error.
#[derive(Debug)]
pub struct SensitivityTable {
    source: TableSource,
    curves: [OnceCell<Result<Arc<SensitivityCurve>>>; 2],
}

impl Default for SensitivityTable {
    fn default() -> Self {
        Self::embedded()
    }
}

impl SensitivityTable {
    /// Tables compiled into the crate.
    pub fn embedded() -> Self {
        Self {
            source: TableSource::Embedded,
            curves: [OnceCell::new(), OnceCell::new()],
        }
    }

    /// Tables read from `dir`, named after [`ResolutionMode::resource_name`].
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            source: TableSource::Directory(dir.as_ref().to_path_buf()),
            curves: [OnceCell::new(), OnceCell::new()],
        }
    }

    /// The curve for `mode`, loading it on first use.
    pub fn load(&self, mode: ResolutionMode) -> Result<Arc<SensitivityCurve>> {
        self.curves[mode.index()]
            .get_or_init(|| self.read(mode).map(Arc::new))
            .clone()
    }

    /// Same as [`SensitivityTable::load`] for a raw resolution value.
    pub fn load_value(&self, resolution: u32) -> Result<Arc<SensitivityCurve>> {
        self.load(ResolutionMode::try_from(resolution)?)
    }

    pub fn resolving_power(&self, wavelength_um: f64, mode: ResolutionMode) -> Result<f64> {
        self.load(mode)?.resolving_power(wavelength_um)
    }

    pub fn min_detectable_flux(&self, wavelength_um: f64, mode: ResolutionMode) -> Result<f64> {
        self.load(mode)?.min_detectable_flux(wavelength_um)
    }

    fn read(&self, mode: ResolutionMode) -> Result<SensitivityCurve> {
        let name = mode.resource_name();
        let curve = match &self.source {
            TableSource::Embedded => {
                let text = match mode {
                    ResolutionMode::R100 => R100_TABLE,
                    ResolutionMode::R1000 => R1000_TABLE,
                };
                SensitivityCurve::parse(mode, name, text)?
            }
            TableSource::Directory(dir) => {
                let path = dir.join(name);
                debug!("reading sensitivity table {}", path.display());
                let text = std::fs::read_to_string(&path)
                    .map_err(|_| NoiseError::ResourceNotFound { path: path.clone() })?;
                SensitivityCurve::parse(mode, &path.display().to_string(), &text)?
            }
        };
        let (lo, hi) = curve.coverage_um();
        info!(
            "loaded {mode} sensitivity table: {} rows, {lo:.3}-{hi:.3} um",
            curve.len()
        );
        Ok(curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn embedded_tables_cover_the_nirspec_range() {
        let table = SensitivityTable::embedded();
        let r100 = table.load(ResolutionMode::R100).unwrap();
        let r1000 = table.load(ResolutionMode::R1000).unwrap();
        let (lo, hi) = r100.coverage_um();
        assert!(lo <= 0.7 && hi >= 5.0);
        let (lo, hi) = r1000.coverage_um();
        assert!(lo <= 1.0 && hi >= 5.0);
        assert_eq!(r100.mode(), ResolutionMode::R100);
    }

    #[test]
    fn curves_are_cached() {
        let table = SensitivityTable::embedded();
        let a = table.load(ResolutionMode::R100).unwrap();
        let b = table.load(ResolutionMode::R100).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn interpolates_table_columns() {
        let text = "# wl R flux\n1.0 100 50\n2.0 200 150 extra\n";
        let curve = SensitivityCurve::parse(ResolutionMode::R100, "inline", text).unwrap();
        assert_relative_eq!(curve.resolving_power(1.5).unwrap(), 150.0);
        assert_relative_eq!(curve.min_detectable_flux(1.25).unwrap(), 75.0);
        assert!(matches!(
            curve.min_detectable_flux(2.5),
            Err(NoiseError::InterpolationRange { .. })
        ));
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let err = SensitivityCurve::parse(ResolutionMode::R100, "bad", "1.0 100 x\n2.0 1 1\n")
            .unwrap_err();
        assert!(matches!(err, NoiseError::MalformedResource { line: 1, .. }));

        let err = SensitivityCurve::parse(ResolutionMode::R100, "bad", "1.0 100\n2.0 1 1\n")
            .unwrap_err();
        assert!(matches!(err, NoiseError::MalformedResource { line: 1, .. }));

        let err = SensitivityCurve::parse(ResolutionMode::R100, "bad", "2.0 1 1\n1.0 1 1\n")
            .unwrap_err();
        assert!(matches!(err, NoiseError::MalformedResource { line: 2, .. }));
    }

    #[test]
    fn non_positive_minimum_flux_is_rejected() {
        for bad in ["0", "-40", "inf", "NaN"] {
            let text = format!("1.0 100 50\n2.0 100 {bad}\n");
            let err = SensitivityCurve::parse(ResolutionMode::R100, "bad", &text).unwrap_err();
            assert!(
                matches!(err, NoiseError::MalformedResource { line: 2, .. }),
                "{bad}: {err:?}"
            );
        }
    }

    #[test]
    fn unsupported_resolution_is_rejected() {
        let table = SensitivityTable::embedded();
        assert_eq!(
            table.load_value(50).unwrap_err(),
            NoiseError::UnsupportedResolution(50)
        );
    }

    #[test]
    fn missing_file_fails_the_same_way_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let table = SensitivityTable::from_dir(dir.path());
        let first = table.load(ResolutionMode::R1000).unwrap_err();
        assert!(matches!(first, NoiseError::ResourceNotFound { .. }));

        // Writing the file afterwards does not change the cached outcome.
        let mut f = std::fs::File::create(dir.path().join("nirspec_sensitivity_R1000.dat")).unwrap();
        writeln!(f, "1.0 1000 10\n2.0 1000 10").unwrap();
        assert_eq!(table.load(ResolutionMode::R1000).unwrap_err(), first);
    }

    #[test]
    fn reads_tables_from_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("nirspec_sensitivity_R100.dat")).unwrap();
        writeln!(f, "1.0 50 100\n3.0 150 300").unwrap();
        let table = SensitivityTable::from_dir(dir.path());
        assert_relative_eq!(
            table.min_detectable_flux(2.0, ResolutionMode::R100).unwrap(),
            200.0
        );
    }
}
