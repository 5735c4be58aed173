use crate::config::{ComputeType, ModelSize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const HF_WHISPER_BASE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";
const HF_VAD_BASE: &str = "https://huggingface.co/ggml-org/whisper-vad/resolve/main";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to download model: {0}")]
    Http(String),
}

/// A model file hosted on Hugging Face
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    pub filename: String,
    pub url: String,
    /// Approximate size in MB
    pub size_mb: u64,
}

impl ModelFile {
    /// Whisper ggml file for a model size and precision.
    ///
    /// whisper.cpp has no runtime precision switch, so quantized compute
    /// types select the q8_0 file and float types the f16 file. large-v3
    /// is only published as q5_0.
    pub fn whisper(size: ModelSize, compute_type: ComputeType) -> Self {
        let (suffix, size_mb) = match (size, compute_type.is_quantized()) {
            (_, false) => ("", size.size_mb()),
            (ModelSize::LargeV3, true) => ("-q5_0", 1080),
            (ModelSize::Tiny, true) => ("-q8_0", 42),
            (ModelSize::Base, true) => ("-q8_0", 78),
            (ModelSize::Small, true) => ("-q8_0", 252),
            (ModelSize::Medium, true) => ("-q8_0", 785),
            (ModelSize::LargeV2, true) => ("-q8_0", 1500),
        };
        let filename = format!("ggml-{}{}.bin", size.name(), suffix);

        Self {
            url: format!("{}/{}", HF_WHISPER_BASE, filename),
            filename,
            size_mb,
        }
    }

    /// Silero voice activity detection model for whisper.cpp
    pub fn silero_vad() -> Self {
        let filename = "ggml-silero-v5.1.2.bin".to_string();
        Self {
            url: format!("{}/{}", HF_VAD_BASE, filename),
            filename,
            size_mb: 1,
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.filename)
    }

    /// Check if the file exists and is at least half the expected size
    pub fn is_downloaded(&self, dir: &Path) -> bool {
        match fs::metadata(self.path_in(dir)) {
            Ok(metadata) => {
                let expected_bytes = self.size_mb * 1024 * 1024;
                metadata.is_file() && metadata.len() >= expected_bytes / 2
            }
            Err(_) => false,
        }
    }
}

/// Download a model file into `dir` unless it is already there
pub fn download_model(file: &ModelFile, dir: &Path) -> Result<PathBuf, DownloadError> {
    let path = file.path_in(dir);

    if file.is_downloaded(dir) {
        info!("Model {} already downloaded at {:?}", file.filename, path);
        return Ok(path);
    }

    fs::create_dir_all(dir)?;

    info!("Downloading {} (~{}MB)...", file.filename, file.size_mb);

    let mut response = reqwest::blocking::Client::new()
        .get(&file.url)
        .send()
        .map_err(|e| DownloadError::Http(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(DownloadError::Http(format!(
            "HTTP {} from {}",
            response.status(),
            file.url
        )));
    }

    let total_size = response.content_length().unwrap_or(0);

    let pb = indicatif::ProgressBar::new(total_size);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    // Stream into a temp file so an interrupted download is never mistaken for a model
    let temp_path = path.with_extension("bin.tmp");
    let file_out = BufWriter::new(File::create(&temp_path)?);
    let mut writer = pb.wrap_write(file_out);

    let result = response
        .copy_to(&mut writer)
        .map_err(|e| DownloadError::Http(format!("Failed to read response: {}", e)))
        .and_then(|_| writer.flush().map_err(DownloadError::from));

    drop(writer);

    if let Err(e) = result {
        pb.abandon_with_message("Download failed");
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    pb.finish_with_message("Download complete");

    fs::rename(&temp_path, &path)?;

    info!("Model downloaded to {:?}", path);

    Ok(path)
}
