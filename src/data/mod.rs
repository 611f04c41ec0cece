/// Data layer: core types, file I/O and wavelength filtering.
///
/// Architecture:
/// ```text
///  .dat / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Spectrum, write result columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Spectrum, ResolutionMode, NoiseRealization
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  wavelength windows, strict edge cropping
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
