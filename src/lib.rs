//! BBL Decoder Library
//!
//! A Rust library for decoding Betaflight/EmuFlight/INAV blackbox log files
//! and extracting gyro samples from them.
//!
//! # Features
//!
//! - **`csv`** (default): Enable CSV export of gyro samples and headers
//! - **`cli`** (default): Build the `bbl_decode` command-line binary
//! - **`json`**: Enable JSON export of decode results
//! - **`serde`**: Enable serialization/deserialization of types
//!
//! # Quick Start
//!
//! Decode a buffer and read its gyro samples:
//! ```rust,no_run
//! use bbl_decoder::{decode_bbl_bytes, DecodeOptions};
//!
//! let data = std::fs::read("flight.BBL").unwrap();
//! let result = decode_bbl_bytes(&data, &DecodeOptions::default());
//! println!("Decoded {} frames", result.frame_count);
//! for sample in result.gyro_data.iter().take(5) {
//!     println!("{} {:.2} {:.2} {:.2}", sample.timestamp, sample.gyro_x, sample.gyro_y, sample.gyro_z);
//! }
//! if let Some(error) = &result.error {
//!     println!("Stopped early: {error}");
//! }
//! ```
//!
//! Bound the work done on untrusted input:
//! ```rust,no_run
//! use bbl_decoder::{decode_bbl_file, DecodeOptions};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let options = DecodeOptions {
//!     resync_limit: 256,
//!     max_frames: Some(100_000),
//!     time_budget: Some(Duration::from_secs(2)),
//!     ..DecodeOptions::default()
//! };
//! let result = decode_bbl_file(Path::new("flight.BBL"), &options).unwrap();
//! assert!(result.frame_count <= 100_000);
//! ```
//!
//! # Public API
//!
//! ## Decoding Functions
//! - [`decode_bbl_bytes`] - Decode a buffer as one log into a [`DecodeResult`]
//! - [`decode_bbl_bytes_all_logs`] - Decode every log in a buffer
//! - [`decode_bbl_file`] / [`decode_bbl_file_all_logs`] - Same, reading from disk
//! - [`parse_single_log`] - Low-level API returning the full [`BBLLog`]
//! - [`FrameStream`] - Frame-by-frame iteration over a binary stream
//!
//! ## Data Types
//! - [`DecodeResult`] - Caller-facing outcome: success, frame count, headers, gyro data, error
//! - [`BBLLog`] - Complete decoded log with all frames, stats and stop reason
//! - [`DecodedFrame`] - Individual frame with values in definition order
//! - [`Headers`] / [`FrameTypeTable`] - Parsed header metadata and field definitions
//! - [`DecodeOptions`] - Per-call limits and gyro field selection
//!
//! ## Export Functions
//! - [`export_result`] - Export a result in every enabled format
//! - [`compute_export_paths`] - Helper for consistent path computation
//!
//! ## Analysis
//! - [`has_minimal_gyro_activity`] - Detect ground tests vs actual flights
//! - [`extract_gyro_samples`] - Build gyro samples from decoded frames

pub mod conversion;
pub mod error;
pub mod export;
pub mod filters;
pub mod gyro;
pub mod parser;
pub mod types;

pub use conversion::{
    convert_gyro_to_deg_per_sec, extract_firmware_version, extract_major_firmware_version,
    GYRO_SCALE,
};
pub use error::{BBLError, Result};
#[cfg(feature = "csv")]
pub use export::{export_headers_to_csv, export_to_csv};
#[cfg(feature = "json")]
pub use export::export_to_json;
pub use export::{compute_export_paths, export_result, ExportOptions, ExportPaths, ExportReport};
pub use filters::{calculate_variance, has_minimal_gyro_activity};
pub use gyro::{extract_gyro_samples, GyroOptions};
pub use parser::{
    decode_bbl_bytes, decode_bbl_bytes_all_logs, decode_bbl_file, decode_bbl_file_all_logs,
    parse_bbl_bytes_all_logs, parse_single_log, split_logs, summarize_log, BBLDataStream,
    DecodeOptions, Encoding, FrameDecoder, FrameStream, Predictor, DEFAULT_RESYNC_LIMIT,
    LOG_START_MARKER,
};
pub use types::*;
