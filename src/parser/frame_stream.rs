//! Frame stream state machine
//!
//! Drives the binary part of a log: reads a marker byte, hands the payload to
//! the [`FrameDecoder`] (or the event parser for `E`), and skips unknown bytes
//! in a bounded resynchronization scan. The stream owns every piece of session
//! state, so independent streams never interact.

use crate::error::BBLError;
use crate::parser::event::parse_e_frame;
use crate::parser::frame::FrameDecoder;
use crate::parser::main::DecodeOptions;
use crate::parser::stream::BBLDataStream;
use crate::types::{
    DecodedFrame, FrameHistory, FrameStats, FrameType, FrameTypeTable, Headers, StreamEnd,
    StreamStatus,
};
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Frames of each type logged at debug level before going quiet
const DEBUG_FRAMES_PER_TYPE: u32 = 3;
/// Resync episodes logged before going quiet
const DEBUG_RESYNC_EPISODES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Reading,
    /// Scanning for a known marker; `start` is where the episode began
    Resyncing { start: usize, attempts: usize },
    Done,
}

/// Everything a finished stream produced
#[derive(Debug)]
pub struct StreamOutput {
    pub frames: Vec<DecodedFrame>,
    pub stats: FrameStats,
    pub end: StreamEnd,
}

pub struct FrameStream<'a> {
    stream: BBLDataStream<'a>,
    decoder: FrameDecoder<'a>,
    history: FrameHistory,
    state: StreamState,
    stats: FrameStats,
    end: Option<StreamEnd>,
    resync_limit: usize,
    max_frames: Option<usize>,
    time_budget: Option<Duration>,
    started: Instant,
    emitted: usize,
}

impl<'a> FrameStream<'a> {
    pub fn new(
        data: &'a [u8],
        table: &'a FrameTypeTable,
        headers: &Headers,
        options: &DecodeOptions,
    ) -> Self {
        Self {
            stream: BBLDataStream::new(data),
            decoder: FrameDecoder::new(table, headers),
            history: FrameHistory::new(table),
            state: StreamState::Reading,
            stats: FrameStats::default(),
            end: None,
            resync_limit: options.resync_limit,
            max_frames: options.max_frames,
            time_budget: options.time_budget,
            started: Instant::now(),
            emitted: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Why the stream stopped, once it reached `Done`
    pub fn end(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }

    /// Drive the stream to completion
    pub fn run(mut self) -> StreamOutput {
        let frames: Vec<DecodedFrame> = self.by_ref().collect();
        let end = self.end.take().unwrap_or_else(StreamEnd::clean);

        debug!(
            "Frame stream finished ({}): {} frames, {} resync episodes, {} bytes skipped",
            end.status, self.stats.total_frames, self.stats.resync_count, self.stats.skipped_bytes
        );
        if let Some(reason) = &end.reason {
            debug!("Stream stop reason: {reason}");
        }

        StreamOutput {
            frames,
            stats: self.stats,
            end,
        }
    }

    /// Advance until a frame is produced or the stream is done
    pub fn next_frame(&mut self) -> Option<DecodedFrame> {
        loop {
            match self.state {
                StreamState::Done => return None,
                StreamState::Reading => {
                    if let Some(frame) = self.read_step() {
                        return Some(frame);
                    }
                }
                StreamState::Resyncing { start, attempts } => self.resync_step(start, attempts),
            }
        }
    }

    fn is_known_marker(&self, byte: u8) -> bool {
        match FrameType::from_marker(byte) {
            Some(FrameType::Event) => true,
            Some(frame_type) => self.decoder.table().contains(frame_type),
            None => false,
        }
    }

    fn finish(&mut self, end: StreamEnd) {
        self.stats.total_bytes = self.stream.position() as u64;
        self.end = Some(end);
        self.state = StreamState::Done;
    }

    fn budget_exhausted(&self) -> Option<String> {
        if let Some(max) = self.max_frames {
            if self.emitted >= max {
                return Some(format!("frame limit of {max} reached"));
            }
        }
        if let Some(budget) = self.time_budget {
            if self.started.elapsed() >= budget {
                return Some(format!(
                    "time budget of {} ms exceeded",
                    budget.as_millis()
                ));
            }
        }
        None
    }

    fn begin_resync(&mut self, start: usize) {
        self.stats.resync_count += 1;
        if self.stats.resync_count <= DEBUG_RESYNC_EPISODES {
            debug!("Resynchronizing from offset {start}");
        }
        self.state = StreamState::Resyncing { start, attempts: 0 };
    }

    /// One step in `Reading`; returns the frame when one was decoded
    fn read_step(&mut self) -> Option<DecodedFrame> {
        if self.stream.is_eof() {
            self.finish(StreamEnd::clean());
            return None;
        }
        if let Some(reason) = self.budget_exhausted() {
            self.finish(StreamEnd::limited(reason));
            return None;
        }

        let offset = self.stream.position();
        let marker = match self.stream.peek_byte() {
            Ok(marker) => marker,
            Err(_) => {
                self.finish(StreamEnd::clean());
                return None;
            }
        };
        let frame_type = match FrameType::from_marker(marker) {
            Some(frame_type) if self.is_known_marker(marker) => frame_type,
            _ => {
                self.begin_resync(offset);
                return None;
            }
        };
        self.stream.set_position(offset + 1);

        let decoded = if frame_type == FrameType::Event {
            parse_e_frame(&mut self.stream).map(|record| (record.frame, record.log_end))
        } else {
            self.decoder
                .decode(frame_type, &mut self.stream, &mut self.history)
                .map(|frame| (frame, false))
        };

        match decoded {
            Ok((frame, log_end)) => {
                self.stats.record(frame_type);
                self.emitted += 1;
                if self.stats.count(frame_type) <= DEBUG_FRAMES_PER_TYPE {
                    debug!("{frame_type} frame at offset {offset}: {:?}", frame.values);
                }
                if log_end {
                    if !self.stream.is_eof() {
                        debug!(
                            "Log end event at offset {offset}, ignoring {} trailing bytes",
                            self.stream.remaining()
                        );
                    }
                    self.finish(StreamEnd::clean());
                }
                Some(frame)
            }
            Err(BBLError::UnexpectedEof) => {
                self.finish(StreamEnd::from_error(
                    StreamStatus::Truncated,
                    format!("truncated {frame_type} frame at offset {offset}"),
                    BBLError::UnexpectedEof,
                ));
                None
            }
            Err(BBLError::InvalidFrame(reason)) if frame_type == FrameType::Event => {
                // unknown event type: treat the marker as noise
                debug!("Discarding event at offset {offset}: {reason}");
                self.begin_resync(self.stream.position());
                None
            }
            Err(error) => {
                warn!("Stopping at {frame_type} frame at offset {offset}: {error}");
                self.finish(StreamEnd::from_error(
                    StreamStatus::Fatal,
                    format!("failed to decode {frame_type} frame at offset {offset}"),
                    error,
                ));
                None
            }
        }
    }

    /// One step in `Resyncing`: skip a byte, or return to `Reading` on a known marker
    fn resync_step(&mut self, start: usize, attempts: usize) {
        let byte = match self.stream.peek_byte() {
            Ok(byte) => byte,
            Err(_) => {
                self.finish(StreamEnd::from_error(
                    StreamStatus::Truncated,
                    format!("end of data while resynchronizing from offset {start}"),
                    BBLError::UnexpectedEof,
                ));
                return;
            }
        };

        if self.is_known_marker(byte) {
            self.state = StreamState::Reading;
            return;
        }

        if attempts >= self.resync_limit {
            let error = BBLError::UnresolvableCorruption {
                offset: start,
                attempts,
            };
            warn!("{error}");
            self.finish(StreamEnd::from_error(
                StreamStatus::Fatal,
                "resynchronization failed".to_string(),
                error,
            ));
            return;
        }

        self.stream.set_position(self.stream.position() + 1);
        self.stats.skipped_bytes += 1;
        self.state = StreamState::Resyncing {
            start,
            attempts: attempts + 1,
        };
    }
}

impl Iterator for FrameStream<'_> {
    type Item = DecodedFrame;

    fn next(&mut self) -> Option<DecodedFrame> {
        self.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::header::parse_headers_from_text;

    const GYRO_HEADER: &str = "H Field I name:gyroADC[0],gyroADC[1],gyroADC[2]\n\
H Field I signed:1,1,1\n\
H Field I predictor:0,0,0\n\
H Field I encoding:0,0,0\n";

    fn run(data: &[u8], options: &DecodeOptions) -> StreamOutput {
        let (headers, table) = parse_headers_from_text(GYRO_HEADER, false).unwrap();
        FrameStream::new(data, &table, &headers, options).run()
    }

    #[test]
    fn test_clean_end() {
        let output = run(b"I\x00\x00\x00I\x02\x04\x06", &DecodeOptions::default());
        assert_eq!(output.frames.len(), 2);
        assert_eq!(output.frames[1].values, vec![1, 2, 3]);
        assert_eq!(output.end.status, StreamStatus::Clean);
        assert!(output.end.reason.is_none());
        assert_eq!(output.stats.i_frames, 2);
        assert_eq!(output.stats.total_bytes, 8);
    }

    #[test]
    fn test_unknown_byte_is_skipped() {
        let output = run(b"\xffI\x00\x00\x00", &DecodeOptions::default());
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.stats.total_frames, 1);
        assert_eq!(output.stats.resync_count, 1);
        assert_eq!(output.stats.skipped_bytes, 1);
        assert_eq!(output.end.status, StreamStatus::Clean);
    }

    #[test]
    fn test_undefined_frame_type_triggers_resync() {
        // P has no definitions here, so its marker is noise
        let output = run(b"PI\x00\x00\x00", &DecodeOptions::default());
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.stats.skipped_bytes, 1);
    }

    #[test]
    fn test_truncated_frame_keeps_earlier_frames() {
        let output = run(b"I\x00\x00\x00I\x02\x84", &DecodeOptions::default());
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.end.status, StreamStatus::Truncated);
        assert!(output.end.reason.unwrap().contains("truncated I frame at offset 4"));
    }

    #[test]
    fn test_resync_bound_is_per_episode() {
        let options = DecodeOptions {
            resync_limit: 2,
            ..DecodeOptions::default()
        };
        let output = run(b"\xf0\xf1I\x00\x00\x00\xf2\xf3I\x00\x00\x00", &options);
        assert_eq!(output.frames.len(), 2);
        assert_eq!(output.stats.resync_count, 2);
        assert_eq!(output.end.status, StreamStatus::Clean);

        let output = run(b"I\x00\x00\x00\xf0\xf1\xf2I\x00\x00\x00", &options);
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.end.status, StreamStatus::Fatal);
        assert!(matches!(
            output.end.error,
            Some(BBLError::UnresolvableCorruption {
                offset: 4,
                attempts: 2
            })
        ));
    }

    #[test]
    fn test_end_of_data_while_resyncing_is_truncation() {
        let output = run(b"I\x00\x00\x00\xf0\xf1", &DecodeOptions::default());
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.end.status, StreamStatus::Truncated);
    }

    #[test]
    fn test_unsupported_encoding_is_fatal() {
        let text = "H Field I name:a\nH Field I signed:0\nH Field I predictor:0\nH Field I encoding:2\n";
        let (headers, table) = parse_headers_from_text(text, false).unwrap();
        let output = FrameStream::new(b"I\x00I\x00", &table, &headers, &DecodeOptions::default()).run();
        assert!(output.frames.is_empty());
        assert_eq!(output.end.status, StreamStatus::Fatal);
        assert!(matches!(output.end.error, Some(BBLError::InvalidEncoding(2))));
    }

    #[test]
    fn test_events_and_log_end() {
        let output = run(
            b"I\x00\x00\x00E\x0f\x01E\xffEnd of log\x00I\x00\x00\x00",
            &DecodeOptions::default(),
        );
        assert_eq!(output.frames.len(), 3);
        assert_eq!(output.stats.e_frames, 2);
        assert_eq!(output.frames[1].get("reason"), Some(1));
        assert_eq!(output.end.status, StreamStatus::Clean);
    }

    #[test]
    fn test_unknown_event_resyncs_after_type_byte() {
        let output = run(b"E\x63I\x00\x00\x00", &DecodeOptions::default());
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.frames[0].frame_type, FrameType::Intra);
        assert_eq!(output.stats.resync_count, 1);
        assert_eq!(output.stats.skipped_bytes, 0);
    }

    #[test]
    fn test_frame_budget() {
        let options = DecodeOptions {
            max_frames: Some(1),
            ..DecodeOptions::default()
        };
        let output = run(b"I\x00\x00\x00I\x00\x00\x00", &options);
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.end.status, StreamStatus::Limited);
        assert!(output.end.reason.unwrap().contains("frame limit"));
    }

    #[test]
    fn test_zero_time_budget_stops_immediately() {
        let options = DecodeOptions {
            time_budget: Some(Duration::ZERO),
            ..DecodeOptions::default()
        };
        let output = run(b"I\x00\x00\x00", &options);
        assert!(output.frames.is_empty());
        assert_eq!(output.end.status, StreamStatus::Limited);
    }

    #[test]
    fn test_iterator_reports_state() {
        let (headers, table) = parse_headers_from_text(GYRO_HEADER, false).unwrap();
        let options = DecodeOptions::default();
        let mut stream = FrameStream::new(b"I\x00\x00\x00", &table, &headers, &options);
        assert_eq!(stream.state(), StreamState::Reading);
        assert!(stream.next().is_some());
        assert!(stream.next().is_none());
        assert_eq!(stream.state(), StreamState::Done);
        assert_eq!(stream.end().map(|end| end.status), Some(StreamStatus::Clean));
    }
}
