use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, LargeListArray, ListArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value as JsonValue};

use super::model::Spectrum;

const WAVELENGTH: &str = "wavelength";
const FLUX: &str = "flux";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a restframe spectrum from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.dat` / `.txt` – two whitespace-separated columns, header row skipped
/// * `.csv`          – `wavelength` and `flux` columns
/// * `.json`         – `{ "wavelength": [...], "flux": [...] }`
/// * `.parquet`      – Float64 `wavelength` and `flux` columns
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    let spectrum = match extension(path).as_str() {
        "dat" | "txt" => load_text(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::info!("loaded {} samples from {}", spectrum.len(), path.display());
    Ok(spectrum)
}

/// Write named, equal-length columns to a file.  Dispatch by extension:
/// `.csv`, `.json`, `.parquet` or `.dat`/`.txt` (whitespace, header row).
pub fn write_columns(path: &Path, columns: &[(&str, &[f64])]) -> Result<()> {
    let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    if let Some((name, v)) = columns.iter().find(|(_, v)| v.len() != n_rows) {
        bail!("column '{name}' has {} rows, expected {n_rows}", v.len());
    }

    let written = match extension(path).as_str() {
        "dat" | "txt" => write_text(path, columns, n_rows),
        "csv" => write_csv(path, columns, n_rows),
        "json" => write_json(path, columns),
        "parquet" | "pq" => write_parquet(path, columns),
        other => bail!("Unsupported output extension: .{other}"),
    };
    written.with_context(|| format!("writing {}", path.display()))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn build_spectrum(wavelength: Vec<f64>, flux: Vec<f64>) -> Result<Spectrum> {
    Spectrum::new(wavelength, flux).context("invalid spectrum")
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

/// Whitespace-delimited columns `[wavelength_A, flux_erg/s/A]`. The first
/// line is a header; `#` comments and blank lines are ignored.
fn load_text(path: &Path) -> Result<Spectrum> {
    let text = std::fs::read_to_string(path).context("reading spectrum file")?;
    let mut wavelength = Vec::new();
    let mut flux = Vec::new();

    for (i, line) in text.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut cols = line.split_whitespace();
        let (Some(w), Some(f)) = (cols.next(), cols.next()) else {
            bail!("Line {}: expected two columns", i + 1);
        };
        wavelength.push(
            w.parse::<f64>()
                .with_context(|| format!("Line {}: '{w}' is not a number", i + 1))?,
        );
        flux.push(
            f.parse::<f64>()
                .with_context(|| format!("Line {}: '{f}' is not a number", i + 1))?,
        );
    }

    build_spectrum(wavelength, flux)
}

fn write_text(path: &Path, columns: &[(&str, &[f64])], n_rows: usize) -> Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    let header: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    writeln!(out, "{}", header.join(" "))?;
    for row in 0..n_rows {
        let cells: Vec<String> = columns.iter().map(|(_, v)| format!("{:.6e}", v[row])).collect();
        writeln!(out, "{}", cells.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// CSV layout: header row with `wavelength` and `flux` columns; any other
/// columns are ignored.
fn load_csv(path: &Path) -> Result<Spectrum> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let w_idx = column(WAVELENGTH)?;
    let f_idx = column(FLUX)?;

    let mut wavelength = Vec::new();
    let mut flux = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        wavelength.push(parse_cell(record.get(w_idx), row_no, WAVELENGTH)?);
        flux.push(parse_cell(record.get(f_idx), row_no, FLUX)?);
    }

    build_spectrum(wavelength, flux)
}

fn parse_cell(cell: Option<&str>, row: usize, col: &str) -> Result<f64> {
    let s = cell.unwrap_or("").trim();
    s.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

fn write_csv(path: &Path, columns: &[(&str, &[f64])], n_rows: usize) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns.iter().map(|(name, _)| *name))?;
    for row in 0..n_rows {
        writer.write_record(columns.iter().map(|(_, v)| v[row].to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// { "wavelength": [1000.0, 1001.0, ...], "flux": [1.2e40, 1.3e40, ...] }
/// ```
fn load_json(path: &Path) -> Result<Spectrum> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let obj = root.as_object().context("Expected top-level JSON object")?;

    let wavelength = json_array_to_f64(obj.get(WAVELENGTH), WAVELENGTH)?;
    let flux = json_array_to_f64(obj.get(FLUX), FLUX)?;
    build_spectrum(wavelength, flux)
}

fn json_array_to_f64(val: Option<&JsonValue>, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("{col}[{j}]: not a number"))
        })
        .collect()
}

fn write_json(path: &Path, columns: &[(&str, &[f64])]) -> Result<()> {
    let obj: Map<String, JsonValue> = columns
        .iter()
        .map(|(name, v)| (name.to_string(), JsonValue::from(v.to_vec())))
        .collect();
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &JsonValue::Object(obj))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one spectrum.
///
/// `wavelength` and `flux` are either plain Float64/Float32 columns (one row
/// per sample) or List columns holding the whole spectrum in a single row.
fn load_parquet(path: &Path) -> Result<Spectrum> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut wavelength = Vec::new();
    let mut flux = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let w_idx = schema
            .index_of(WAVELENGTH)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{WAVELENGTH}' column"))?;
        let f_idx = schema
            .index_of(FLUX)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{FLUX}' column"))?;

        wavelength.extend(extract_f64_column(batch.column(w_idx)).context(WAVELENGTH)?);
        flux.extend(extract_f64_column(batch.column(f_idx)).context(FLUX)?);
    }

    build_spectrum(wavelength, flux)
}

// -- Parquet / Arrow helpers --

/// Flatten a Float64/Float32 column, or a List/LargeList of them, to `f64`.
fn extract_f64_column(col: &ArrayRef) -> Result<Vec<f64>> {
    match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            let mut out = Vec::new();
            for row in 0..list_arr.len() {
                out.extend(extract_f64_column(&list_arr.value(row))?);
            }
            Ok(out)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            let mut out = Vec::new();
            for row in 0..list_arr.len() {
                out.extend(extract_f64_column(&list_arr.value(row))?);
            }
            Ok(out)
        }
        _ => {
            if col.null_count() > 0 {
                bail!("null values in numeric column");
            }
            if let Some(f64_arr) = col.as_any().downcast_ref::<Float64Array>() {
                Ok(f64_arr.values().to_vec())
            } else if let Some(f32_arr) = col.as_any().downcast_ref::<Float32Array>() {
                Ok(f32_arr.values().iter().map(|&v| v as f64).collect())
            } else {
                bail!("column type is {:?}, expected Float64 or Float32", col.data_type())
            }
        }
    }
}

fn write_parquet(path: &Path, columns: &[(&str, &[f64])]) -> Result<()> {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, v)| Arc::new(Float64Array::from(v.to_vec())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Spectrum {
        Spectrum::new(vec![1000.0, 1500.0, 2000.0], vec![1e40, 2e40, 3e40]).unwrap()
    }

    fn round_trip(ext: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("spectrum.{ext}"));
        let sp = sample();
        write_columns(&path, &[(WAVELENGTH, sp.wavelength()), (FLUX, sp.flux())]).unwrap();
        let loaded = load_spectrum(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        for (a, b) in loaded.iter().zip(sp.iter()) {
            assert!((a.0 - b.0).abs() <= 1e-6 * b.0);
            assert!((a.1 - b.1).abs() <= 1e-6 * b.1);
        }
    }

    #[test]
    fn every_format_reads_back() {
        for ext in ["dat", "csv", "json", "parquet"] {
            round_trip(ext);
        }
    }

    #[test]
    fn text_header_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("galaxy.dat");
        std::fs::write(&path, "lambda flux\n1000  1.0e40\n\n1010\t2.0e40\n").unwrap();
        let sp = load_spectrum(&path).unwrap();
        assert_eq!(sp.wavelength(), &[1000.0, 1010.0]);
        assert_eq!(sp.flux(), &[1.0e40, 2.0e40]);
    }

    #[test]
    fn unsorted_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("galaxy.txt");
        std::fs::write(&path, "header\n1010 1\n1000 2\n").unwrap();
        assert!(load_spectrum(&path).is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(load_spectrum(Path::new("spectrum.fits")).is_err());
        assert!(write_columns(Path::new("out.fits"), &[]).is_err());
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let a = [1.0, 2.0];
        let b = [1.0];
        assert!(write_columns(&path, &[("a", &a[..]), ("b", &b[..])]).is_err());
    }
}
