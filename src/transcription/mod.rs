//! Transcription driver and transcript output.

pub mod driver;
pub mod transcript;

pub use driver::transcribe;
pub use transcript::format_timestamp;
