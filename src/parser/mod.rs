pub mod decoder;
pub mod event;
pub mod frame;
pub mod frame_stream;
pub mod header;
pub mod helpers;
pub mod main;
pub mod stream;

pub use decoder::{Encoding, PredictionContext, Predictor};
pub use event::{parse_e_frame, EventRecord};
pub use frame::FrameDecoder;
pub use frame_stream::{FrameStream, StreamOutput, StreamState};
pub use header::{default_frame_table, parse_header, parse_headers_from_text, ParsedHeader};
pub use main::*;
pub use stream::BBLDataStream;
