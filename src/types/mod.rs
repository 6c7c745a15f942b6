pub mod decode;
pub mod frame;
pub mod gyro;
pub mod header;

pub use decode::*;
pub use frame::*;
pub use gyro::*;
pub use header::*;
