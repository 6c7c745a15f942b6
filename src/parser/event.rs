//! Event frame parsing
//!
//! E frames have no header-defined layout: an event-type byte is followed by a
//! payload whose shape depends on the type. Each decoded event becomes a
//! [`DecodedFrame`] of type [`FrameType::Event`] whose first field is
//! `eventType`.

use crate::error::{BBLError, Result};
use crate::parser::stream::BBLDataStream;
use crate::types::{DecodedFrame, FrameType};
use log::debug;
use std::sync::Arc;

pub const EVENT_SYNC_BEEP: u8 = 0;
pub const EVENT_INFLIGHT_ADJUSTMENT: u8 = 13;
pub const EVENT_LOGGING_RESUME: u8 = 14;
pub const EVENT_DISARM: u8 = 15;
pub const EVENT_FLIGHT_MODE: u8 = 30;
pub const EVENT_LOG_END: u8 = 255;

/// Text the firmware writes after a log-end event
const LOG_END_MESSAGE: &[u8] = b"End of log\0";

/// Adjustment functions with bit 7 set carry a float value
const ADJUSTMENT_FLOAT_FLAG: u8 = 0x80;

/// A decoded event and whether it terminates the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub frame: DecodedFrame,
    pub log_end: bool,
}

/// Human-readable name of an event type
pub fn event_name(event_type: u8) -> Option<&'static str> {
    match event_type {
        EVENT_SYNC_BEEP => Some("Sync beep"),
        EVENT_INFLIGHT_ADJUSTMENT => Some("Inflight adjustment"),
        EVENT_LOGGING_RESUME => Some("Logging resume"),
        EVENT_DISARM => Some("Disarm"),
        EVENT_FLIGHT_MODE => Some("Flight mode change"),
        EVENT_LOG_END => Some("Log end"),
        _ => None,
    }
}

/// Parse an E frame with `stream` positioned just after the `E` marker.
///
/// An unknown event type is reported as [`BBLError::InvalidFrame`] with the
/// cursor left just past the type byte.
pub fn parse_e_frame(stream: &mut BBLDataStream) -> Result<EventRecord> {
    let event_type = stream.read_byte()?;

    let mut names = vec!["eventType"];
    let mut values = vec![i64::from(event_type)];
    let mut log_end = false;

    match event_type {
        EVENT_SYNC_BEEP => {
            names.push("time");
            values.push(i64::from(stream.read_unsigned_vb()?));
        }
        EVENT_INFLIGHT_ADJUSTMENT => {
            let function = stream.read_byte()?;
            names.push("function");
            values.push(i64::from(function & !ADJUSTMENT_FLOAT_FLAG));
            if function & ADJUSTMENT_FLOAT_FLAG != 0 {
                // IEEE-754 bits, recover with f32::from_bits
                names.push("newFloatValueBits");
                values.push(stream.read_fixed_width(32)? as i64);
            } else {
                names.push("newValue");
                values.push(i64::from(stream.read_signed_vb()?));
            }
        }
        EVENT_LOGGING_RESUME => {
            names.extend(["logIteration", "currentTime"]);
            values.push(i64::from(stream.read_unsigned_vb()?));
            values.push(i64::from(stream.read_unsigned_vb()?));
        }
        EVENT_DISARM => {
            names.push("reason");
            values.push(i64::from(stream.read_unsigned_vb()?));
        }
        EVENT_FLIGHT_MODE => {
            names.extend(["flags", "lastFlags"]);
            values.push(i64::from(stream.read_unsigned_vb()?));
            values.push(i64::from(stream.read_unsigned_vb()?));
        }
        EVENT_LOG_END => {
            stream.consume_if(LOG_END_MESSAGE);
            log_end = true;
        }
        other => {
            return Err(BBLError::InvalidFrame(format!("unknown event type {other}")));
        }
    }

    debug!(
        "Event: {} ({event_type}) {values:?}",
        event_name(event_type).unwrap_or("unknown")
    );

    let field_names: Arc<[String]> = names.into_iter().map(String::from).collect();
    Ok(EventRecord {
        frame: DecodedFrame::new(FrameType::Event, field_names, values),
        log_end,
    })
}
