//! Audio helpers built on the ffmpeg command line tools.

pub mod decode;
pub mod probe;

pub use decode::{load_samples, DecodeError, WHISPER_SAMPLE_RATE};
pub use probe::{format_duration, DurationProbe, FfprobeProbe};
