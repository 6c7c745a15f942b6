//! Field encodings and predictors.
//!
//! Ids from the `H Field ... encoding/predictor` header lines map onto
//! [`Encoding`] and [`Predictor`]; ids without a decode rule are kept as
//! `Unsupported` so the header still parses and the stream stops when a frame
//! actually needs them.

use crate::error::{BBLError, Result};
use crate::types::FieldHistory;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const ENCODING_SIGNED_VB: u8 = 0;
pub const ENCODING_UNSIGNED_VB: u8 = 1;
pub const ENCODING_NEG_14BIT: u8 = 3;
pub const ENCODING_TAG8_8SVB: u8 = 6;
pub const ENCODING_TAG2_3S32: u8 = 7;
pub const ENCODING_TAG8_4S16: u8 = 8;
pub const ENCODING_NULL: u8 = 9;

pub const PREDICT_ZERO: u8 = 0;
pub const PREDICT_STRAIGHT_LINE: u8 = 1;
pub const PREDICT_AVERAGE_2: u8 = 2;
pub const PREDICT_MINTHROTTLE: u8 = 3;
pub const PREDICT_MOTOR_0: u8 = 4;
pub const PREDICT_INCREMENT: u8 = 5;
pub const PREDICT_HOME_COORD: u8 = 6;
pub const PREDICT_LAST_MAIN_FRAME_TIME: u8 = 7;
pub const PREDICT_MINMOTOR: u8 = 8;

/// Default `minthrottle` when the header omits it
const DEFAULT_MINTHROTTLE: i64 = 1150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Encoding {
    SignedVB,
    UnsignedVB,
    Neg14Bit,
    Tag8_8SVB,
    Tag2_3S32,
    Tag8_4S16,
    Null,
    Unsupported(u8),
}

impl Encoding {
    pub fn from_id(id: u8) -> Self {
        match id {
            ENCODING_SIGNED_VB => Encoding::SignedVB,
            ENCODING_UNSIGNED_VB => Encoding::UnsignedVB,
            ENCODING_NEG_14BIT => Encoding::Neg14Bit,
            ENCODING_TAG8_8SVB => Encoding::Tag8_8SVB,
            ENCODING_TAG2_3S32 => Encoding::Tag2_3S32,
            ENCODING_TAG8_4S16 => Encoding::Tag8_4S16,
            ENCODING_NULL => Encoding::Null,
            other => Encoding::Unsupported(other),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Encoding::SignedVB => ENCODING_SIGNED_VB,
            Encoding::UnsignedVB => ENCODING_UNSIGNED_VB,
            Encoding::Neg14Bit => ENCODING_NEG_14BIT,
            Encoding::Tag8_8SVB => ENCODING_TAG8_8SVB,
            Encoding::Tag2_3S32 => ENCODING_TAG2_3S32,
            Encoding::Tag8_4S16 => ENCODING_TAG8_4S16,
            Encoding::Null => ENCODING_NULL,
            Encoding::Unsupported(id) => id,
        }
    }

    /// Number of consecutive fields one read of a packed encoding covers
    pub fn group_size(self) -> usize {
        match self {
            Encoding::Tag8_8SVB => 8,
            Encoding::Tag2_3S32 => 3,
            Encoding::Tag8_4S16 => 4,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Predictor {
    /// Field holds its absolute value
    Zero,
    /// `2 * prev - prev2`
    StraightLine,
    /// `floor((prev + prev2) / 2)`
    Average2,
    /// Header `minthrottle`
    MinThrottle,
    /// `motor[0]` of the same frame
    Motor0,
    /// `prev + 1`
    Increment,
    /// `GPS_home[n]` of the latest H frame
    HomeCoord,
    /// `time` of the latest main frame
    LastMainFrameTime,
    /// First value of header `motorOutput`
    MinMotor,
    Unsupported(u8),
}

impl Predictor {
    pub fn from_id(id: u8) -> Self {
        match id {
            PREDICT_ZERO => Predictor::Zero,
            PREDICT_STRAIGHT_LINE => Predictor::StraightLine,
            PREDICT_AVERAGE_2 => Predictor::Average2,
            PREDICT_MINTHROTTLE => Predictor::MinThrottle,
            PREDICT_MOTOR_0 => Predictor::Motor0,
            PREDICT_INCREMENT => Predictor::Increment,
            PREDICT_HOME_COORD => Predictor::HomeCoord,
            PREDICT_LAST_MAIN_FRAME_TIME => Predictor::LastMainFrameTime,
            PREDICT_MINMOTOR => Predictor::MinMotor,
            other => Predictor::Unsupported(other),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Predictor::Zero => PREDICT_ZERO,
            Predictor::StraightLine => PREDICT_STRAIGHT_LINE,
            Predictor::Average2 => PREDICT_AVERAGE_2,
            Predictor::MinThrottle => PREDICT_MINTHROTTLE,
            Predictor::Motor0 => PREDICT_MOTOR_0,
            Predictor::Increment => PREDICT_INCREMENT,
            Predictor::HomeCoord => PREDICT_HOME_COORD,
            Predictor::LastMainFrameTime => PREDICT_LAST_MAIN_FRAME_TIME,
            Predictor::MinMotor => PREDICT_MINMOTOR,
            Predictor::Unsupported(id) => id,
        }
    }
}

/// Session values the non-history predictors read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionContext {
    pub minthrottle: Option<i64>,
    pub min_motor: Option<i64>,
    /// `motor[0]` already decoded in the current frame
    pub motor0: Option<i64>,
    /// Matching `GPS_home[n]` for the field being decoded
    pub home_coord: Option<i64>,
    pub last_main_frame_time: Option<i64>,
}

/// Base value predicted from a field's own history
pub fn predict_from_history(predictor: Predictor, history: FieldHistory) -> Option<i64> {
    let value = match predictor {
        Predictor::Zero => 0,
        Predictor::StraightLine => match (history.prev, history.prev2) {
            (Some(prev), Some(prev2)) => prev.wrapping_mul(2).wrapping_sub(prev2),
            (Some(prev), None) => prev,
            _ => 0,
        },
        Predictor::Average2 => match (history.prev, history.prev2) {
            (Some(prev), Some(prev2)) => {
                // floor((prev + prev2) / 2) without forming the sum
                prev.div_euclid(2)
                    + prev2.div_euclid(2)
                    + (prev.rem_euclid(2) + prev2.rem_euclid(2)) / 2
            }
            (Some(prev), None) | (None, Some(prev)) => prev,
            (None, None) => 0,
        },
        Predictor::Increment => history.prev.map_or(0, |prev| prev.wrapping_add(1)),
        _ => return None,
    };
    Some(value)
}

/// Base value for `predictor`, given the field's history and session context
pub fn predict(
    predictor: Predictor,
    history: FieldHistory,
    context: &PredictionContext,
) -> Result<i64> {
    if let Some(base) = predict_from_history(predictor, history) {
        return Ok(base);
    }
    match predictor {
        Predictor::MinThrottle => Ok(context.minthrottle.unwrap_or(DEFAULT_MINTHROTTLE)),
        Predictor::Motor0 => Ok(context.motor0.unwrap_or(0)),
        Predictor::HomeCoord => Ok(context.home_coord.unwrap_or(0)),
        Predictor::LastMainFrameTime => Ok(context.last_main_frame_time.unwrap_or(0)),
        Predictor::MinMotor => Ok(context.min_motor.unwrap_or(0)),
        Predictor::Unsupported(id) => Err(BBLError::InvalidPredictor(id)),
        // history predictors handled above
        _ => Ok(0),
    }
}

/// Combine a decoded value with its predicted base.
///
/// Arithmetic wraps at 64 bits.
///
/// `Zero` fields carry the absolute value, so the decoded value is returned
/// untouched; every other predictor adds the base to a delta.
pub fn reconstruct(predictor: Predictor, decoded: i64, base: i64) -> i64 {
    match predictor {
        Predictor::Zero => decoded,
        _ => decoded.wrapping_add(base),
    }
}
