//! # nirspec-noise
//!
//! Rebin a restframe galaxy spectrum to NIRSpec resolution and add a noise
//! realization.
//!
//! ## Usage
//!
//! ```bash
//! # Rebin to the prism grid at z=7
//! nirspec-noise rebin galaxy.dat -z 7 -r 100 -o galaxy_R100.csv
//!
//! # Rebin and add noise for a 9000 s exposure
//! nirspec-noise noise galaxy.dat -z 7 -r 100 --exposure 9000 -o noisy.parquet
//!
//! # Rebin and add noise normalised to S/N=5 at 1500 A
//! nirspec-noise noise galaxy.dat -z 7 -r 1000 --snr 5 --seed 1 -o noisy.csv
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use log::info;

use nirspec_noise::config::Config;
use nirspec_noise::data::loader::{load_spectrum, write_columns};
use nirspec_noise::{ResolutionMode, Spectrum, WavelengthWindow};

/// NIRSpec rebinning and noise realizations
#[derive(Parser)]
#[command(name = "nirspec-noise")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the NIRSpec bin edges (Angstrom)
    Bins {
        /// Resolution mode (100 or 1000)
        #[arg(short, long, default_value = "100")]
        resolution: u32,

        /// Redshift; edges are shifted to the restframe when given
        #[arg(short)]
        z: Option<f64>,

        /// Keep only edges strictly above this restframe wavelength
        #[arg(long, requires = "max")]
        min: Option<f64>,

        /// Keep only edges strictly below this restframe wavelength
        #[arg(long, requires = "min")]
        max: Option<f64>,
    },

    /// Rebin a restframe spectrum to NIRSpec resolution
    Rebin {
        /// Input spectrum (.dat, .txt, .csv, .json, .parquet)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Redshift of the source
        #[arg(short, default_value = "7")]
        z: f64,

        /// Resolution mode (100 or 1000)
        #[arg(short, long, default_value = "100")]
        resolution: u32,

        /// Output file (.csv, .json, .parquet, .dat)
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Rebin a spectrum and add a noise realization
    #[command(group(ArgGroup::new("mode").required(true).args(["exposure", "snr"])))]
    Noise {
        /// Input spectrum (.dat, .txt, .csv, .json, .parquet)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Redshift of the source
        #[arg(short, default_value = "7")]
        z: f64,

        /// Resolution mode (100 or 1000)
        #[arg(short, long, default_value = "100")]
        resolution: u32,

        /// Exposure time in seconds
        #[arg(long)]
        exposure: Option<f64>,

        /// Target S/N at restframe 1500 A
        #[arg(long)]
        snr: Option<f64>,

        /// Seed for a reproducible realization
        #[arg(long)]
        seed: Option<u64>,

        /// Noise the input spectrum as is, without rebinning
        #[arg(long)]
        no_rebin: bool,

        /// Output file (.csv, .json, .parquet, .dat)
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Tabulate resolving power and minimum detectable flux
    Sensitivity {
        /// Resolution mode (100 or 1000)
        #[arg(short, long, default_value = "100")]
        resolution: u32,

        /// Number of wavelengths across the table coverage
        #[arg(short = 'n', long, default_value = "20")]
        points: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Bins { resolution, z, min, max } => {
            let mode = ResolutionMode::try_from(resolution)?;
            let window = min.zip(max).map(WavelengthWindow::from);
            let (binner, _) = config.build();
            let edges = binner.compute_bin_edges(mode, z, window)?;
            for e in edges.as_slice() {
                println!("{e:.4}");
            }
        }

        Commands::Rebin { input, z, resolution, output } => {
            let mode = ResolutionMode::try_from(resolution)?;
            let spectrum = load_spectrum(&input)?;
            let (binner, _) = config.build();
            let rebinned = binner
                .rebin(&spectrum, mode, z)
                .with_context(|| format!("rebinning {}", input.display()))?;
            info!("{} samples -> {} {mode} bins", spectrum.len(), rebinned.len());
            write_spectrum(&output, &rebinned, &[])?;
        }

        Commands::Noise {
            input,
            z,
            resolution,
            exposure,
            snr,
            seed,
            no_rebin,
            output,
        } => {
            let mode = ResolutionMode::try_from(resolution)?;
            let spectrum = load_spectrum(&input)?;
            let (binner, model) = config.build();
            let spectrum = if no_rebin {
                spectrum
            } else {
                binner.rebin(&spectrum, mode, z)?
            };

            let mut rng = config.gaussian_source(seed);
            let noise = match (exposure, snr) {
                (Some(t), _) => model.noise_for_fixed_time(&spectrum, t, z, mode, &mut rng)?,
                (None, Some(sn)) => model.noise_for_fixed_sn(&spectrum, sn, z, mode, &mut rng)?,
                (None, None) => unreachable!("clap requires --exposure or --snr"),
            };
            let noisy = noise.apply(&spectrum);
            write_spectrum(
                &output,
                &spectrum,
                &[
                    ("noise", &noise.values),
                    ("noisy_flux", &noisy),
                    ("snr", &noise.signal_to_noise),
                ],
            )?;
        }

        Commands::Sensitivity { resolution, points } => {
            let curve = config.sensitivity_table().load_value(resolution)?;
            let (lo, hi) = curve.coverage_um();
            let steps = points.max(2);
            println!("{:>10} {:>10} {:>12}", "lambda_um", "R", "F_min_nJy");
            for i in 0..steps {
                let w = lo + (hi - lo) * i as f64 / (steps - 1) as f64;
                println!(
                    "{w:>10.4} {:>10.1} {:>12.2}",
                    curve.resolving_power(w)?,
                    curve.min_detectable_flux(w)?
                );
            }
        }
    }

    Ok(())
}

fn write_spectrum(path: &Path, spectrum: &Spectrum, extra: &[(&str, &Vec<f64>)]) -> Result<()> {
    let mut columns: Vec<(&str, &[f64])> = vec![
        ("wavelength", spectrum.wavelength()),
        ("flux", spectrum.flux()),
    ];
    columns.extend(extra.iter().map(|(name, v)| (*name, v.as_slice())));
    write_columns(path, &columns)?;
    info!("wrote {} rows to {}", spectrum.len(), path.display());
    Ok(())
}
