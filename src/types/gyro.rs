#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One gyro reading: raw sensor units and degrees/second
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GyroSample {
    pub timestamp: i64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub gyro_x_raw: i64,
    pub gyro_y_raw: i64,
    pub gyro_z_raw: i64,
}
