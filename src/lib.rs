pub mod acquisition;
pub mod config;

pub use acquisition::{AcquisitionLoop, FrameHandle, SampleSource, StopReason};
pub use config::{RunConfig, RunOptions};
