//! Command line configuration.
//!
//! Every run parameter is fixed once at startup and never changes afterwards.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Language passed to Whisper. Not exposed as a flag.
pub const LANGUAGE: &str = "de";

/// Whisper model sizes that can be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    #[value(name = "large-v2")]
    LargeV2,
    #[value(name = "large-v3")]
    LargeV3,
}

impl ModelSize {
    /// Name used in ggml model filenames
    pub fn name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::LargeV2 => "large-v2",
            ModelSize::LargeV3 => "large-v3",
        }
    }

    /// Approximate size of the f16 model file in MB
    pub fn size_mb(&self) -> u64 {
        match self {
            ModelSize::Tiny => 75,
            ModelSize::Base => 142,
            ModelSize::Small => 466,
            ModelSize::Medium => 1500,
            ModelSize::LargeV2 | ModelSize::LargeV3 => 3100,
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where inference runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Device {
    Auto,
    Cpu,
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Auto => write!(f, "auto"),
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Numeric precision used for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ComputeType {
    #[value(name = "int8")]
    Int8,
    #[value(name = "int8_float16")]
    Int8Float16,
    #[value(name = "float16")]
    Float16,
    #[value(name = "float32")]
    Float32,
}

impl ComputeType {
    pub fn is_quantized(&self) -> bool {
        matches!(self, ComputeType::Int8 | ComputeType::Int8Float16)
    }
}

impl std::fmt::Display for ComputeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComputeType::Int8 => write!(f, "int8"),
            ComputeType::Int8Float16 => write!(f, "int8_float16"),
            ComputeType::Float16 => write!(f, "float16"),
            ComputeType::Float32 => write!(f, "float32"),
        }
    }
}

/// Transcribe an audio file to German text using Whisper.
#[derive(Debug, Parser)]
#[command(name = "transcribe-de", version)]
pub struct Cli {
    /// Path to input audio file.
    #[arg(long = "input", default_value = "Interview_KR.mp3")]
    pub input_path: PathBuf,

    /// Path to output text file.
    #[arg(long = "output", default_value = "Interview_KR.txt")]
    pub output_path: PathBuf,

    /// Whisper model size.
    #[arg(long, value_enum, default_value_t = ModelSize::LargeV3)]
    pub model_size: ModelSize,

    /// Device to run on.
    #[arg(long, value_enum, default_value_t = Device::Auto)]
    pub device: Device,

    /// Precision (int8 for faster CPU inference).
    #[arg(long, value_enum, default_value_t = ComputeType::Int8)]
    pub compute_type: ComputeType,

    /// Disable VAD filter (voice activity detection).
    #[arg(long)]
    pub no_vad: bool,

    /// Include timestamps for each segment in the output.
    #[arg(long)]
    pub timestamps: bool,

    /// Directory where model files are stored and downloaded to.
    #[arg(long, env = "WHISPER_MODELS_DIR", default_value = "models/whisper")]
    pub models_dir: PathBuf,

    /// Number of inference threads (defaults to available parallelism).
    #[arg(long, env = "WHISPER_THREADS", value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: Option<u16>,
}

/// Immutable run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub model_size: ModelSize,
    pub device: Device,
    pub compute_type: ComputeType,
    pub language: String,
    pub vad_filter: bool,
    pub print_timestamps: bool,
    pub models_dir: PathBuf,
    pub n_threads: i32,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let n_threads = match cli.threads {
            Some(n) => i32::from(n),
            None => default_threads(),
        };

        Self {
            input_path: cli.input_path,
            output_path: cli.output_path,
            model_size: cli.model_size,
            device: cli.device,
            compute_type: cli.compute_type,
            language: LANGUAGE.to_string(),
            vad_filter: !cli.no_vad,
            print_timestamps: cli.timestamps,
            models_dir: cli.models_dir,
            n_threads,
        }
    }
}

fn default_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|p| (p.get() as i32).max(1))
        .unwrap_or(4)
}
