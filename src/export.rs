//! Export functionality for decode results
//!
//! Writes a [`DecodeResult`] as JSON, and its gyro samples and headers as CSV.
//! Output files sit next to the input unless an output directory is given.

use crate::error::BBLError;
use crate::types::DecodeResult;
#[cfg(feature = "csv")]
use crate::types::{GyroSample, Headers};
use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Export options for controlling output formats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub json: bool,
    pub csv: bool,
    pub output_dir: Option<String>,
}

/// Output paths for one log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub gyro_csv: PathBuf,
    pub headers_csv: PathBuf,
}

/// Files written by [`export_result`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub json_path: Option<PathBuf>,
    pub gyro_csv_path: Option<PathBuf>,
    pub headers_csv_path: Option<PathBuf>,
}

impl ExportReport {
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        [&self.json_path, &self.gyro_csv_path, &self.headers_csv_path]
            .into_iter()
            .flatten()
    }
}

/// Compute output paths for a log.
///
/// Files of a multi-log input carry a `.NN` log suffix after the stem.
pub fn compute_export_paths(
    input_path: &Path,
    export_options: &ExportOptions,
    log_number: usize,
    total_logs: usize,
) -> ExportPaths {
    let base_name = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("blackbox");

    let output_dir = match &export_options.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let log_suffix = if total_logs > 1 {
        format!(".{log_number:02}")
    } else {
        String::new()
    };

    ExportPaths {
        json: output_dir.join(format!("{base_name}{log_suffix}_decoded.json")),
        gyro_csv: output_dir.join(format!("{base_name}{log_suffix}.gyro.csv")),
        headers_csv: output_dir.join(format!("{base_name}{log_suffix}.headers.csv")),
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            debug!("Created output directory: {}", dir.display());
        }
    }
    Ok(())
}

/// Export one log's result in every format enabled in `export_options`
pub fn export_result(
    result: &DecodeResult,
    input_path: &Path,
    log_number: usize,
    total_logs: usize,
    export_options: &ExportOptions,
) -> Result<ExportReport> {
    let paths = compute_export_paths(input_path, export_options, log_number, total_logs);
    let mut report = ExportReport::default();

    if export_options.json {
        #[cfg(feature = "json")]
        {
            export_to_json(result, &paths.json)?;
            report.json_path = Some(paths.json);
        }
        #[cfg(not(feature = "json"))]
        return Err(BBLError::Export("JSON export requires the `json` feature".into()).into());
    }

    if export_options.csv {
        #[cfg(feature = "csv")]
        {
            export_to_csv(&result.gyro_data, &paths.gyro_csv)?;
            export_headers_to_csv(&result.headers, &paths.headers_csv)?;
            report.gyro_csv_path = Some(paths.gyro_csv);
            report.headers_csv_path = Some(paths.headers_csv);
        }
        #[cfg(not(feature = "csv"))]
        return Err(BBLError::Export("CSV export requires the `csv` feature".into()).into());
    }

    Ok(report)
}

/// Write a decode result as pretty-printed JSON
#[cfg(feature = "json")]
pub fn export_to_json(result: &DecodeResult, output_path: &Path) -> Result<()> {
    use std::io::{BufWriter, Write};

    ensure_parent_dir(output_path)?;
    let file = std::fs::File::create(output_path)
        .with_context(|| format!("Failed to create JSON file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)
        .map_err(|e| BBLError::Export(e.to_string()))
        .with_context(|| format!("Failed to write JSON file: {}", output_path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush JSON file: {}", output_path.display()))?;

    debug!("Exported decode result to {}", output_path.display());
    Ok(())
}

/// Write gyro samples as CSV: timestamp, raw axes, scaled axes
#[cfg(feature = "csv")]
pub fn export_to_csv(samples: &[GyroSample], output_path: &Path) -> Result<()> {
    ensure_parent_dir(output_path)?;
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create gyro CSV file: {}", output_path.display()))?;

    writer.write_record([
        "timestamp",
        "gyro_x_raw",
        "gyro_y_raw",
        "gyro_z_raw",
        "gyro_x",
        "gyro_y",
        "gyro_z",
    ])?;
    for sample in samples {
        writer.write_record(&[
            sample.timestamp.to_string(),
            sample.gyro_x_raw.to_string(),
            sample.gyro_y_raw.to_string(),
            sample.gyro_z_raw.to_string(),
            format!("{:.6}", sample.gyro_x),
            format!("{:.6}", sample.gyro_y),
            format!("{:.6}", sample.gyro_z),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush gyro CSV file: {}", output_path.display()))?;

    debug!(
        "Exported {} gyro samples to {}",
        samples.len(),
        output_path.display()
    );
    Ok(())
}

/// Write header metadata as `Field,Value` CSV in header order
#[cfg(feature = "csv")]
pub fn export_headers_to_csv(headers: &Headers, output_path: &Path) -> Result<()> {
    ensure_parent_dir(output_path)?;
    let mut writer = csv::Writer::from_path(output_path).with_context(|| {
        format!("Failed to create headers CSV file: {}", output_path.display())
    })?;

    writer.write_record(["Field", "Value"])?;
    for (key, value) in headers.iter() {
        writer.write_record([key, value])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush headers CSV file: {}", output_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_export_paths_next_to_input() {
        let paths = compute_export_paths(
            Path::new("/logs/flight.BBL"),
            &ExportOptions::default(),
            1,
            1,
        );
        assert_eq!(paths.json, PathBuf::from("/logs/flight_decoded.json"));
        assert_eq!(paths.gyro_csv, PathBuf::from("/logs/flight.gyro.csv"));
        assert_eq!(paths.headers_csv, PathBuf::from("/logs/flight.headers.csv"));
    }

    #[test]
    fn test_compute_export_paths_multi_log_with_output_dir() {
        let options = ExportOptions {
            output_dir: Some("/tmp/out".to_string()),
            ..ExportOptions::default()
        };
        let paths = compute_export_paths(Path::new("flight.BBL"), &options, 2, 3);
        assert_eq!(paths.json, PathBuf::from("/tmp/out/flight.02_decoded.json"));
        assert_eq!(paths.gyro_csv, PathBuf::from("/tmp/out/flight.02.gyro.csv"));
    }

    #[test]
    fn test_nothing_requested_writes_nothing() {
        let result = DecodeResult::failure(&BBLError::UnexpectedEof);
        let report = export_result(
            &result,
            Path::new("/nonexistent/flight.BBL"),
            1,
            1,
            &ExportOptions::default(),
        )
        .unwrap();
        assert_eq!(report.paths().count(), 0);
    }
}
