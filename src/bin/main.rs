//! CLI binary for the BBL decoder
//!
//! Decodes blackbox logs, prints a summary and exports JSON/CSV next to them.

use anyhow::Result;
use bbl_decoder::{
    decode_bbl_file, decode_bbl_file_all_logs, export_result, extract_firmware_version,
    has_minimal_gyro_activity, DecodeOptions, DecodeResult, ExportOptions,
};
use clap::{value_parser, Arg, ArgAction, Command};
use glob::glob;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::time::Duration;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")");
const SAMPLES_SHOWN: usize = 5;

fn main() -> Result<()> {
    let matches = Command::new("BBL Decoder")
        .version(VERSION)
        .about("Decode BBL blackbox log files and extract gyro data.")
        .arg(
            Arg::new("files")
                .help("BBL files to decode (.BBL, .BFL, .TXT extensions supported, case-insensitive, supports globbing)")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output and detailed decoding information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .help("Export gyro samples to .gyro.csv and headers to .headers.csv")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-json")
                .long("no-json")
                .help("Do not write the _decoded.json result file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for output files (default: same as input file)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("all-logs")
                .long("all-logs")
                .help("Decode every log in a file separately instead of the whole file as one log")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("resync-limit")
                .long("resync-limit")
                .help("Bytes skipped per resynchronization attempt before giving up")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-frames")
                .long("max-frames")
                .help("Stop after decoding this many frames")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .help("Stop decoding a log after this many milliseconds")
                .value_name("MS")
                .value_parser(value_parser!(u64)),
        )
        .get_matches();

    let debug = matches.get_flag("debug");
    init_logging(debug);

    let mut decode_options = DecodeOptions {
        max_frames: matches.get_one::<usize>("max-frames").copied(),
        time_budget: matches
            .get_one::<u64>("timeout-ms")
            .map(|ms| Duration::from_millis(*ms)),
        ..DecodeOptions::default()
    };
    if let Some(limit) = matches.get_one::<usize>("resync-limit") {
        decode_options.resync_limit = *limit;
    }

    let export_options = ExportOptions {
        json: !matches.get_flag("no-json"),
        csv: matches.get_flag("csv"),
        output_dir: matches.get_one::<String>("output-dir").cloned(),
    };
    let all_logs = matches.get_flag("all-logs");

    let file_patterns: Vec<&String> = matches
        .get_many::<String>("files")
        .map(|files| files.collect())
        .unwrap_or_default();
    log::debug!("Input patterns: {file_patterns:?}");

    let valid_paths = collect_paths(&file_patterns);
    if valid_paths.is_empty() {
        eprintln!("Error: No valid files found to process.");
        eprintln!("Supported extensions: .BBL, .BFL, .TXT (case-insensitive)");
        eprintln!("Input patterns were: {file_patterns:?}");
        std::process::exit(1);
    }

    let mut decoded_files = 0;
    for (index, path) in valid_paths.iter().enumerate() {
        if index > 0 {
            println!();
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        println!("Processing: {filename}");

        let results = if all_logs {
            decode_bbl_file_all_logs(path, &decode_options)
        } else {
            decode_bbl_file(path, &decode_options).map(|result| vec![result])
        };

        let results = match results {
            Ok(results) => results,
            Err(e) => {
                eprintln!("Error processing {filename}: {e:#}");
                eprintln!("Continuing with next file...");
                continue;
            }
        };

        let total_logs = results.len();
        let mut any_success = false;
        for (log_index, result) in results.iter().enumerate() {
            if total_logs > 1 {
                println!("Log {} of {total_logs}", log_index + 1);
            }
            print_summary(result);
            any_success |= result.success;

            match export_result(result, path, log_index + 1, total_logs, &export_options) {
                Ok(report) => {
                    for exported in report.paths() {
                        println!("Exported: {}", exported.display());
                    }
                }
                Err(e) => eprintln!("Export failed for {filename}: {e:#}"),
            }
        }

        if any_success {
            decoded_files += 1;
        }
    }

    if decoded_files == 0 {
        eprintln!(
            "Error: No files were successfully decoded out of {} files found.",
            valid_paths.len()
        );
        eprintln!("Use --debug flag for more detailed error information.");
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

/// Expand glob patterns and keep existing files with a supported extension
fn collect_paths(file_patterns: &[&String]) -> Vec<PathBuf> {
    let mut valid_paths = Vec::new();

    for pattern in file_patterns {
        let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
            match glob(pattern) {
                Ok(glob_iter) => match glob_iter.collect::<Result<Vec<_>, _>>() {
                    Ok(paths) => {
                        log::debug!("Glob pattern '{pattern}' matched {} files", paths.len());
                        paths
                    }
                    Err(e) => {
                        eprintln!("Error expanding glob pattern '{pattern}': {e}");
                        continue;
                    }
                },
                Err(e) => {
                    eprintln!("Invalid glob pattern '{pattern}': {e}");
                    continue;
                }
            }
        } else {
            vec![Path::new(pattern.as_str()).to_path_buf()]
        };

        for path in paths {
            if !path.exists() {
                eprintln!("Warning: File does not exist: {path:?}");
                continue;
            }

            let valid_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    let ext_lower = ext.to_ascii_lowercase();
                    ext_lower == "bbl" || ext_lower == "bfl" || ext_lower == "txt"
                })
                .unwrap_or(false);

            if !valid_extension {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("none");
                eprintln!("Warning: Skipping file with unsupported extension '{ext}': {path:?}");
                continue;
            }

            valid_paths.push(path);
        }
    }

    log::debug!("Found {} valid files to process", valid_paths.len());
    valid_paths
}

fn print_summary(result: &DecodeResult) {
    println!("Success: {}", result.success);
    println!("Frames: {}", result.frame_count);
    println!("Gyro samples: {}", result.gyro_data.len());

    if let Some(error) = &result.error {
        println!("Error: {error}");
    }

    if let Some(firmware) = result.headers.firmware_revision() {
        match extract_firmware_version(firmware) {
            Some(version) => println!("Firmware: {firmware} (version {version})"),
            None => println!("Firmware: {firmware}"),
        }
    }

    if !result.gyro_data.is_empty() {
        println!("First {} gyro samples:", SAMPLES_SHOWN.min(result.gyro_data.len()));
        for sample in result.gyro_data.iter().take(SAMPLES_SHOWN) {
            println!(
                "  t={:>10}  x={:>9.3}  y={:>9.3}  z={:>9.3}  (raw {}, {}, {})",
                sample.timestamp,
                sample.gyro_x,
                sample.gyro_y,
                sample.gyro_z,
                sample.gyro_x_raw,
                sample.gyro_y_raw,
                sample.gyro_z_raw
            );
        }

        let (minimal, max_variance) = has_minimal_gyro_activity(&result.gyro_data);
        if minimal {
            println!("Note: minimal gyro activity ({max_variance:.2} variance) - likely ground test");
        }
    }

    if !result.headers.is_empty() {
        println!("Headers ({}):", result.headers.len());
        for (key, value) in result.headers.iter() {
            println!("  {key}: {value}");
        }
    }
}
