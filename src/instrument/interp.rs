use crate::error::{NoiseError, Result};

/// Piecewise-linear interpolation over tabulated `(x, y)` points.
///
/// Queries outside `[x_first, x_last]` fail; there is no extrapolation.
#[derive(Debug, Clone, Copy)]
pub struct LinearInterpolator<'a> {
    xs: &'a [f64],
    ys: &'a [f64],
}

impl<'a> LinearInterpolator<'a> {
    /// `xs` must be strictly increasing and the same length as `ys`.
    pub fn new(xs: &'a [f64], ys: &'a [f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(NoiseError::LengthMismatch {
                wavelength: xs.len(),
                flux: ys.len(),
            });
        }
        if xs.is_empty() {
            return Err(NoiseError::EmptySpectrum);
        }
        if let Some(i) = xs.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(NoiseError::NotAscending { index: i + 1 });
        }
        Ok(Self { xs, ys })
    }

    pub(crate) fn new_unchecked(xs: &'a [f64], ys: &'a [f64]) -> Self {
        debug_assert!(!xs.is_empty() && xs.len() == ys.len());
        Self { xs, ys }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn at(&self, x: f64) -> Result<f64> {
        let (min, max) = self.domain();
        if !(x >= min && x <= max) {
            return Err(NoiseError::InterpolationRange { value: x, min, max });
        }
        // First index with xs[i] >= x; exact hits return the node itself.
        let hi = self.xs.partition_point(|&v| v < x);
        if self.xs[hi] == x {
            return Ok(self.ys[hi]);
        }
        let lo = hi - 1;
        let t = (x - self.xs[lo]) / (self.xs[hi] - self.xs[lo]);
        Ok(self.ys[lo] + t * (self.ys[hi] - self.ys[lo]))
    }

    pub fn at_many(&self, xs: &[f64]) -> Result<Vec<f64>> {
        xs.iter().map(|&x| self.at(x)).collect()
    }
}
