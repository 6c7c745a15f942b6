use crate::error::Result;
use crate::gyro::{extract_gyro_samples, GyroOptions};
use crate::parser::frame_stream::FrameStream;
use crate::parser::header::parse_header;
use crate::types::{BBLLog, DecodeResult};
use anyhow::Context;
use log::{debug, info};
use std::path::Path;
use std::time::Duration;

/// Marker line that opens every log in a file
pub const LOG_START_MARKER: &[u8] = b"H Product:Blackbox flight data recorder by Nicholas Sherlock";

/// Default number of bytes skipped per resynchronization episode before giving up
pub const DEFAULT_RESYNC_LIMIT: usize = 1024;

/// Per-call decode configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    /// Bytes one resynchronization episode may skip
    pub resync_limit: usize,
    /// Stop after this many frames
    pub max_frames: Option<usize>,
    /// Stop once this much wall-clock time has passed, checked between frames
    pub time_budget: Option<Duration>,
    /// Use the built-in main-frame layout when the header defines no fields
    pub default_schema: bool,
    pub gyro: GyroOptions,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            resync_limit: DEFAULT_RESYNC_LIMIT,
            max_frames: None,
            time_budget: None,
            default_schema: true,
            gyro: GyroOptions::default(),
        }
    }
}

/// Split a buffer into logs at each [`LOG_START_MARKER`].
///
/// A buffer without the marker is returned whole, as a single log.
pub fn split_logs(data: &[u8]) -> Vec<&[u8]> {
    let positions: Vec<usize> = data
        .windows(LOG_START_MARKER.len())
        .enumerate()
        .filter(|(_, window)| *window == LOG_START_MARKER)
        .map(|(i, _)| i)
        .collect();

    if positions.is_empty() {
        return vec![data];
    }

    positions
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = positions.get(index + 1).copied().unwrap_or(data.len());
            &data[start..end]
        })
        .collect()
}

/// Decode one log: header, then the full frame stream.
///
/// Only header errors are returned as `Err`; anything the frame stream hits is
/// recorded in [`BBLLog::end`] next to the frames decoded before it.
pub fn parse_single_log(
    log_data: &[u8],
    log_number: usize,
    total_logs: usize,
    options: &DecodeOptions,
) -> Result<BBLLog> {
    debug!(
        "Parsing log {log_number} of {total_logs} ({} bytes)",
        log_data.len()
    );

    let parsed = parse_header(log_data, options.default_schema)?;
    if let Some(firmware) = parsed.headers.firmware_revision() {
        debug!("Firmware: {firmware}");
    }

    let binary_data = &log_data[parsed.binary_start..];
    let output =
        FrameStream::new(binary_data, &parsed.frame_table, &parsed.headers, options).run();

    let mut stats = output.stats;
    stats.total_bytes += parsed.binary_start as u64;

    Ok(BBLLog {
        log_number,
        total_logs,
        headers: parsed.headers,
        frame_table: parsed.frame_table,
        frames: output.frames,
        stats,
        end: output.end,
    })
}

/// Build the caller-facing result for a decoded log
pub fn summarize_log(log: &BBLLog, options: &DecodeOptions) -> DecodeResult {
    let samples = extract_gyro_samples(&log.frames, &options.gyro);
    DecodeResult::from_log(log, samples)
}

/// Decode a buffer as a single log
pub fn decode_bbl_bytes(data: &[u8], options: &DecodeOptions) -> DecodeResult {
    match parse_single_log(data, 1, 1, options) {
        Ok(log) => summarize_log(&log, options),
        Err(error) => {
            debug!("Header rejected: {error}");
            DecodeResult::failure(&error)
        }
    }
}

/// Parse every log in a buffer, each in its own session
pub fn parse_bbl_bytes_all_logs(data: &[u8], options: &DecodeOptions) -> Vec<Result<BBLLog>> {
    let logs = split_logs(data);
    let total = logs.len();
    debug!("Found {total} log(s) in {} bytes", data.len());

    logs.into_iter()
        .enumerate()
        .map(|(index, log_data)| parse_single_log(log_data, index + 1, total, options))
        .collect()
}

/// Decode every log in a buffer
pub fn decode_bbl_bytes_all_logs(data: &[u8], options: &DecodeOptions) -> Vec<DecodeResult> {
    parse_bbl_bytes_all_logs(data, options)
        .into_iter()
        .map(|parsed| match parsed {
            Ok(log) => summarize_log(&log, options),
            Err(error) => DecodeResult::failure(&error),
        })
        .collect()
}

fn read_bbl_file(file_path: &Path) -> anyhow::Result<Vec<u8>> {
    let data = std::fs::read(file_path)
        .with_context(|| format!("Failed to read BBL file: {}", file_path.display()))?;
    info!(
        "Read {} ({:.2} MB)",
        file_path.display(),
        data.len() as f64 / 1024.0 / 1024.0
    );
    Ok(data)
}

/// Read a file and decode it as a single log
pub fn decode_bbl_file(file_path: &Path, options: &DecodeOptions) -> anyhow::Result<DecodeResult> {
    let data = read_bbl_file(file_path)?;
    Ok(decode_bbl_bytes(&data, options))
}

/// Read a file and decode every log in it
pub fn decode_bbl_file_all_logs(
    file_path: &Path,
    options: &DecodeOptions,
) -> anyhow::Result<Vec<DecodeResult>> {
    let data = read_bbl_file(file_path)?;
    Ok(decode_bbl_bytes_all_logs(&data, options))
}
