pub mod error;
pub mod recorder;
pub mod replay;
pub mod runner;
pub mod serial;
pub mod source;
pub mod window;

pub use error::SourceError;
pub use recorder::CsvRecorder;
pub use replay::ReplaySource;
pub use runner::{AcquisitionLoop, RunState, RunSummary, StopReason, Tick};
pub use serial::SerialSource;
pub use source::{ChannelModel, ManualSource, Sample, SampleSource, SyntheticSource, Tone};
pub use window::{BoundedWindow, FrameHandle, WindowFrame};
