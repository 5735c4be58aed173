//! Speech recognition model seam.
//!
//! The driver only talks to [`SpeechModel`] and [`ModelLoader`]; the
//! whisper.cpp backend lives in [`whisper`].

pub mod download;
pub mod stream;
pub mod whisper;

use crate::audio::DecodeError;
use crate::config::{ComputeType, Device, ModelSize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use whisper::WhisperLoader;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Download(#[from] download::DownloadError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Failed to initialize Whisper: {0}")]
    Init(String),
    #[error("Transcription failed: {0}")]
    Transcription(String),
}

/// A recognized span of speech
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Recognized text, untrimmed
    pub text: String,
}

/// Metadata returned alongside the segments
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionInfo {
    /// Language the model transcribed in
    pub language: String,
    /// Length of the audio the model processed, in seconds
    pub duration_secs: f64,
}

/// Per-call transcription options
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    pub language: String,
    /// Filter non-speech regions before decoding
    pub vad_filter: bool,
}

/// Segments as the model produces them, plus metadata
pub struct SegmentStream<'a> {
    pub info: TranscriptionInfo,
    pub segments: Box<dyn Iterator<Item = Result<Segment, ModelError>> + 'a>,
}

/// Everything needed to construct a model
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub size: ModelSize,
    pub device: Device,
    pub compute_type: ComputeType,
    pub models_dir: PathBuf,
    pub n_threads: i32,
    /// Load the VAD model too
    pub vad: bool,
}

/// A loaded speech recognition model
pub trait SpeechModel {
    /// Transcribe the audio file at `audio`
    fn transcribe(
        &mut self,
        audio: &Path,
        request: &TranscribeRequest,
    ) -> Result<SegmentStream<'_>, ModelError>;
}

/// Constructs models from a [`ModelSpec`]
pub trait ModelLoader {
    type Model: SpeechModel;

    fn load(&self, spec: &ModelSpec) -> Result<Self::Model, ModelError>;
}
