//! Gyro sample extraction from decoded frames

use crate::conversion::{convert_gyro_to_deg_per_sec, GYRO_SCALE};
use crate::types::{DecodedFrame, GyroSample};

/// Which fields hold the gyro axes, and how raw units scale to degrees/second
#[derive(Debug, Clone, PartialEq)]
pub struct GyroOptions {
    pub fields: [String; 3],
    pub timestamp_field: String,
    pub scale: f64,
}

impl Default for GyroOptions {
    fn default() -> Self {
        Self {
            fields: [
                "gyroADC[0]".to_string(),
                "gyroADC[1]".to_string(),
                "gyroADC[2]".to_string(),
            ],
            timestamp_field: "time".to_string(),
            scale: GYRO_SCALE,
        }
    }
}

/// Build one sample per frame that carries all three gyro fields.
///
/// Frames missing any axis are skipped. A frame without the timestamp field
/// uses the sample's index instead.
pub fn extract_gyro_samples(frames: &[DecodedFrame], options: &GyroOptions) -> Vec<GyroSample> {
    let mut samples = Vec::new();

    for frame in frames {
        let [x, y, z] = &options.fields;
        let (Some(x), Some(y), Some(z)) = (frame.get(x), frame.get(y), frame.get(z)) else {
            continue;
        };

        let timestamp = frame
            .get(&options.timestamp_field)
            .unwrap_or(samples.len() as i64);

        samples.push(GyroSample {
            timestamp,
            gyro_x: convert_gyro_to_deg_per_sec(x, options.scale),
            gyro_y: convert_gyro_to_deg_per_sec(y, options.scale),
            gyro_z: convert_gyro_to_deg_per_sec(z, options.scale),
            gyro_x_raw: x,
            gyro_y_raw: y,
            gyro_z_raw: z,
        });
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameType;
    use std::sync::Arc;

    fn frame(names: &[&str], values: Vec<i64>) -> DecodedFrame {
        let names: Arc<[String]> = names.iter().map(|n| n.to_string()).collect();
        DecodedFrame::new(FrameType::Intra, names, values)
    }

    #[test]
    fn test_scaling_and_raw_values() {
        let frames = vec![frame(
            &["time", "gyroADC[0]", "gyroADC[1]", "gyroADC[2]"],
            vec![5000, 164, -164, 0],
        )];
        let samples = extract_gyro_samples(&frames, &GyroOptions::default());
        assert_eq!(samples.len(), 1);
        let sample = samples[0];
        assert_eq!(sample.timestamp, 5000);
        assert!((sample.gyro_x - 10.0).abs() < 1e-6);
        assert!((sample.gyro_y + 10.0).abs() < 1e-6);
        assert_eq!(sample.gyro_z, 0.0);
        assert_eq!(
            (sample.gyro_x_raw, sample.gyro_y_raw, sample.gyro_z_raw),
            (164, -164, 0)
        );
    }

    #[test]
    fn test_incomplete_frames_are_skipped() {
        let frames = vec![
            frame(&["gyroADC[0]", "gyroADC[1]"], vec![1, 2]),
            frame(&["eventType"], vec![15]),
            frame(&["gyroADC[0]", "gyroADC[1]", "gyroADC[2]"], vec![1, 2, 3]),
            frame(&["gyroADC[0]", "gyroADC[1]", "gyroADC[2]"], vec![4, 5, 6]),
        ];
        let samples = extract_gyro_samples(&frames, &GyroOptions::default());
        assert_eq!(samples.len(), 2);
        // no time field: index of the sample
        assert_eq!(samples[0].timestamp, 0);
        assert_eq!(samples[1].timestamp, 1);
        assert_eq!(samples[1].gyro_z_raw, 6);
    }

    #[test]
    fn test_custom_fields() {
        let options = GyroOptions {
            fields: ["gx".into(), "gy".into(), "gz".into()],
            timestamp_field: "t".into(),
            scale: 1.0,
        };
        let frames = vec![frame(&["t", "gx", "gy", "gz"], vec![9, 1, 2, 3])];
        let samples = extract_gyro_samples(&frames, &options);
        assert_eq!(samples[0].timestamp, 9);
        assert_eq!(samples[0].gyro_z, 3.0);
    }
}
