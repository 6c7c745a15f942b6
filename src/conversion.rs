//! Unit conversion and firmware version helpers

use semver::Version;

/// Degrees/second per raw gyro LSB
pub const GYRO_SCALE: f64 = 1.0 / 16.4;

/// Firmware families whose revision string is followed by a version number
const FIRMWARE_NAMES: [&str; 3] = ["betaflight", "inav", "emuflight"];

/// Convert a raw gyro reading to degrees/second
pub fn convert_gyro_to_deg_per_sec(raw_value: i64, scale: f64) -> f64 {
    raw_value as f64 * scale
}

/// Extract version from a firmware revision string
/// such as `Betaflight 4.5.1 (77d01ba3b) AT32F435M` or `INAV 7.1.0 (...)`
pub fn extract_firmware_version(firmware_revision: &str) -> Option<Version> {
    let words: Vec<&str> = firmware_revision.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if FIRMWARE_NAMES.iter().any(|name| lower.contains(name)) && i + 1 < words.len() {
            if let Ok(version) = Version::parse(words[i + 1]) {
                return Some(version);
            }
        }
    }
    None
}

/// Extract major firmware version number
pub fn extract_major_firmware_version(firmware_revision: &str) -> Option<u64> {
    extract_firmware_version(firmware_revision).map(|version| version.major)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gyro_scale() {
        assert!((convert_gyro_to_deg_per_sec(164, GYRO_SCALE) - 10.0).abs() < 1e-6);
        assert!((convert_gyro_to_deg_per_sec(-82, GYRO_SCALE) + 5.0).abs() < 1e-6);
        assert_eq!(convert_gyro_to_deg_per_sec(0, GYRO_SCALE), 0.0);
    }

    #[test]
    fn test_extract_firmware_version() {
        assert_eq!(
            extract_firmware_version("Betaflight 4.5.1 (77d01ba3b) AT32F435M"),
            Some(Version::new(4, 5, 1))
        );
        assert_eq!(
            extract_firmware_version("INAV 7.1.2 (a5f3c9a) MATEKF405"),
            Some(Version::new(7, 1, 2))
        );
        assert_eq!(extract_firmware_version("Cleanflight"), None);
        assert_eq!(extract_firmware_version("Betaflight unknown"), None);
    }

    #[test]
    fn test_extract_major_firmware_version() {
        assert_eq!(
            extract_major_firmware_version("EmuFlight 0.4.1 (2f1b5e9) HELIOSPRING"),
            Some(0)
        );
        assert_eq!(extract_major_firmware_version(""), None);
    }
}
