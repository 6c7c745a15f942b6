use crate::error::BBLError;
use crate::types::{DecodedFrame, FrameStats, FrameType, FrameTypeTable, GyroSample, Headers};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the frame stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StreamStatus {
    /// Buffer exhausted on a frame boundary, or a log-end event was read
    Clean,
    /// Buffer ended inside a frame or while resynchronizing
    Truncated,
    /// Unknown encoding/predictor, invalid frame bytes or unresolvable corruption
    Fatal,
    /// Frame-count or wall-clock budget reached
    Limited,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamStatus::Clean => "clean",
            StreamStatus::Truncated => "truncated",
            StreamStatus::Fatal => "fatal",
            StreamStatus::Limited => "limited",
        };
        f.write_str(name)
    }
}

/// Terminal condition of a frame stream
#[derive(Debug)]
pub struct StreamEnd {
    pub status: StreamStatus,
    /// Description of why the stream stopped; `None` for a clean end
    pub reason: Option<String>,
    /// Underlying error, when one caused the stop
    pub error: Option<BBLError>,
}

impl StreamEnd {
    pub fn clean() -> Self {
        Self {
            status: StreamStatus::Clean,
            reason: None,
            error: None,
        }
    }

    pub fn limited(reason: String) -> Self {
        Self {
            status: StreamStatus::Limited,
            reason: Some(reason),
            error: None,
        }
    }

    pub fn from_error(status: StreamStatus, context: String, error: BBLError) -> Self {
        Self {
            status,
            reason: Some(format!("{context}: {error}")),
            error: Some(error),
        }
    }
}

/// Complete output of one decode session
#[derive(Debug)]
pub struct BBLLog {
    pub log_number: usize,
    pub total_logs: usize,
    pub headers: Headers,
    pub frame_table: FrameTypeTable,
    pub frames: Vec<DecodedFrame>,
    pub stats: FrameStats,
    pub end: StreamEnd,
}

impl BBLLog {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn status(&self) -> StreamStatus {
        self.end.status
    }

    /// Iterate frames of a specific type
    pub fn frames_of_type(&self, frame_type: FrameType) -> impl Iterator<Item = &DecodedFrame> {
        self.frames
            .iter()
            .filter(move |frame| frame.frame_type == frame_type)
    }

    /// Time between the first and last main frame, in microseconds
    pub fn duration_us(&self) -> u64 {
        let mut times = self
            .frames
            .iter()
            .filter(|f| f.frame_type.is_main())
            .filter_map(DecodedFrame::timestamp_us);
        let Some(first) = times.next() else {
            return 0;
        };
        let last = times.last().unwrap_or(first);
        last.saturating_sub(first).max(0) as u64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_us() as f64 / 1_000_000.0
    }
}

/// Caller-facing summary of a decode call
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodeResult {
    pub success: bool,
    pub frame_count: usize,
    pub headers: Headers,
    pub gyro_data: Vec<GyroSample>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl DecodeResult {
    /// Apply the partial-result policy: a stream that stopped early still
    /// succeeds when it produced frames, and always carries its reason.
    pub fn from_log(log: &BBLLog, gyro_data: Vec<GyroSample>) -> Self {
        let frame_count = log.frame_count();
        let success = match log.end.status {
            StreamStatus::Clean => true,
            _ => frame_count > 0,
        };
        Self {
            success,
            frame_count,
            headers: log.headers.clone(),
            gyro_data,
            error: log.end.reason.clone(),
        }
    }

    /// Result for a decode that failed before any frame was read
    pub fn failure(error: &BBLError) -> Self {
        Self {
            success: false,
            frame_count: 0,
            headers: Headers::new(),
            gyro_data: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
