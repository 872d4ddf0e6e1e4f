use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Spectrum;

/// Accepted names of the spectral axis column.
const WAVELENGTH_COLUMNS: &[&str] = &["wavelength", "x"];
/// Accepted names of the flux column.
const FLUX_COLUMNS: &[&str] = &["flux", "y"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Whether the loader can read a location, judged by its extension.
pub fn is_supported(path: &Path) -> bool {
    matches!(extension(path).as_str(), "parquet" | "pq" | "json" | "csv")
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Load every spectrum stored in a local table. Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – list columns `wavelength` and `flux`
/// * `.json`    – `[{ "wavelength": [...], "flux": [...], ...meta }, ...]`
/// * `.csv`     – `wavelength` and `flux` holding semicolon-separated floats
///
/// `x` / `y` are accepted in place of `wavelength` / `flux`.
pub fn load_file(path: &Path) -> Result<Vec<Spectrum>> {
    let spectra = match extension(path).as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    if spectra.is_empty() {
        bail!("{} contains no spectra", path.display());
    }
    Ok(spectra)
}

fn find_column<'a, I>(names: I, wanted: &[&str]) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    wanted
        .iter()
        .find_map(|w| names.iter().position(|n| n == w))
}

fn check_lengths(row: usize, spectrum: &Spectrum) -> Result<()> {
    if spectrum.wavelength.len() != spectrum.flux.len() {
        bail!(
            "Row {row}: wavelength has {} values but flux has {}",
            spectrum.wavelength.len(),
            spectrum.flux.len()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, one object per spectrum.
fn load_json(path: &Path) -> Result<Vec<Spectrum>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;
    let mut spectra = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let wl_key = find_column(obj.keys().map(String::as_str), WAVELENGTH_COLUMNS)
            .and_then(|idx| obj.keys().nth(idx))
            .with_context(|| format!("Row {i}: missing wavelength array"))?
            .clone();
        let flux_key = find_column(obj.keys().map(String::as_str), FLUX_COLUMNS)
            .and_then(|idx| obj.keys().nth(idx))
            .with_context(|| format!("Row {i}: missing flux array"))?
            .clone();

        let mut spectrum = Spectrum::new(
            json_array_to_f64(obj.get(&wl_key), i, &wl_key)?,
            json_array_to_f64(obj.get(&flux_key), i, &flux_key)?,
        );
        check_lengths(i, &spectrum)?;

        for (key, val) in obj {
            if *key == wl_key || *key == flux_key {
                continue;
            }
            let text = match val {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            spectrum.meta.insert(key.clone(), text);
        }
        spectra.push(spectrum);
    }

    Ok(spectra)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: '{col}' is not an array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| match v {
            // Masked pixels are written as null.
            JsonValue::Null => Ok(f64::NAN),
            v => v
                .as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number")),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<Spectrum>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let wl_idx = find_column(headers.iter().map(String::as_str), WAVELENGTH_COLUMNS)
        .context("CSV missing wavelength column")?;
    let flux_idx = find_column(headers.iter().map(String::as_str), FLUX_COLUMNS)
        .context("CSV missing flux column")?;

    let mut spectra = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut spectrum = Spectrum::new(
            parse_semicolon_floats(record.get(wl_idx).unwrap_or(""), row_no, &headers[wl_idx])?,
            parse_semicolon_floats(record.get(flux_idx).unwrap_or(""), row_no, &headers[flux_idx])?,
        );
        check_lengths(row_no, &spectrum)?;

        for (col_idx, value) in record.iter().enumerate() {
            if col_idx == wl_idx || col_idx == flux_idx || value.is_empty() {
                continue;
            }
            spectrum.meta.insert(headers[col_idx].clone(), value.to_string());
        }
        spectra.push(spectrum);
    }

    Ok(spectra)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Parquet tables with List<Float64>/List<Float32> spectral columns, as
/// written by Pandas, Polars or the `generate_demo` binary.
fn load_parquet(path: &Path) -> Result<Vec<Spectrum>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;

    let mut spectra = Vec::new();
    let options = FormatOptions::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

        let wl_idx = find_column(names.iter().copied(), WAVELENGTH_COLUMNS)
            .context("Parquet file missing wavelength column")?;
        let flux_idx = find_column(names.iter().copied(), FLUX_COLUMNS)
            .context("Parquet file missing flux column")?;

        let meta_cols = names
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != wl_idx && *i != flux_idx)
            .map(|(i, name)| {
                ArrayFormatter::try_new(batch.column(i).as_ref(), &options)
                    .map(|fmt| (i, name.to_string(), fmt))
                    .context("formatting metadata column")
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let mut spectrum = Spectrum::new(
                extract_f64_list(batch.column(wl_idx), row)
                    .with_context(|| format!("Row {row}: failed to read wavelength"))?,
                extract_f64_list(batch.column(flux_idx), row)
                    .with_context(|| format!("Row {row}: failed to read flux"))?,
            );
            check_lengths(row, &spectrum)?;

            for (col_idx, name, fmt) in &meta_cols {
                if batch.column(*col_idx).is_null(row) {
                    continue;
                }
                spectrum.meta.insert(name.clone(), fmt.value(row).to_string());
            }
            spectra.push(spectrum);
        }
    }

    Ok(spectra)
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_records() {
        let file = write_temp(
            ".json",
            r#"[{"wavelength": [4000.0, 4001.0], "flux": [1.0, null], "mjd": 59000},
                {"x": [1, 2], "y": [3, 4], "telescope": "apo25m"}]"#,
        );
        let spectra = load_file(file.path()).unwrap();
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[0].wavelength, vec![4000.0, 4001.0]);
        assert!(spectra[0].flux[1].is_nan());
        assert_eq!(spectra[0].meta.get("mjd").map(String::as_str), Some("59000"));
        assert_eq!(spectra[1].flux, vec![3.0, 4.0]);
        assert_eq!(spectra[1].meta.get("telescope").map(String::as_str), Some("apo25m"));
    }

    #[test]
    fn test_load_csv() {
        let file = write_temp(
            ".csv",
            "wavelength,flux,visit\n\"1;2;3\",\"4;5;6\",1\n\"1;2\",\"7;8\",2\n",
        );
        let spectra = load_file(file.path()).unwrap();
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[0].flux, vec![4.0, 5.0, 6.0]);
        assert_eq!(spectra[1].meta.get("visit").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let file = write_temp(".csv", "x,y\n\"1;2\",\"3\"\n");
        let err = load_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("wavelength has 2 values"));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".fits", "SIMPLE  =                    T");
        assert!(!is_supported(file.path()));
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn test_empty_table_is_error() {
        let file = write_temp(".json", "[]");
        assert!(load_file(file.path()).is_err());
    }
}
