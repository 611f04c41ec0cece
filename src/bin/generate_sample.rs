use std::path::PathBuf;

use anyhow::Result;

use nirspec_noise::data::loader::write_columns;
use nirspec_noise::{GaussianSource, SeededGaussian};

/// Restframe emission lines: (centre A, width sigma A, peak in units of the
/// continuum at 1500 A).
const LINES: [(f64, f64, f64); 10] = [
    (1215.67, 3.0, 8.0),  // Ly-alpha
    (1549.0, 2.5, 0.8),   // C IV
    (1640.4, 2.5, 0.5),   // He II
    (1908.7, 2.5, 0.9),   // C III]
    (2798.0, 3.0, 0.4),   // Mg II
    (3727.0, 3.0, 1.5),   // [O II]
    (4861.3, 3.5, 1.2),   // H-beta
    (4958.9, 3.5, 1.1),   // [O III]
    (5006.8, 3.5, 3.3),   // [O III]
    (6562.8, 4.0, 3.5),   // H-alpha
];

const LYMAN_ALPHA: f64 = 1215.67;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// UV-slope continuum with emission lines, fully absorbed blueward of
/// Ly-alpha, plus a little intrinsic scatter.
fn generate_spectrum(
    wavelengths: &[f64],
    continuum_1500: f64,
    beta: f64,
    scatter: f64,
    rng: &mut SeededGaussian,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&w| {
            if w < LYMAN_ALPHA - 5.0 {
                return 0.0;
            }
            let continuum = continuum_1500 * (w / 1500.0).powf(beta);
            let lines: f64 = LINES
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(w, mu, sigma, amp * continuum_1500))
                .sum();
            continuum * (1.0 + rng.normal(0.0, scatter)) + lines
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_spectrum.dat"));

    let mut rng = SeededGaussian::seed_from_u64(42);

    // Restframe 900 -> 7000 A, step 1 A
    let wavelengths: Vec<f64> = (0..=6100).map(|i| 900.0 + i as f64).collect();
    let flux = generate_spectrum(&wavelengths, 3.0e40, -2.0, 0.01, &mut rng);

    write_columns(&output, &[("wavelength", &wavelengths[..]), ("flux", &flux[..])])?;

    println!(
        "Wrote spectrum ({} wavelengths, erg/s/A restframe) to {}",
        wavelengths.len(),
        output.display()
    );
    Ok(())
}
