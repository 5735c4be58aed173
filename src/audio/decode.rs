use byteorder::{ByteOrder, LittleEndian};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// Whisper's required sample rate
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read WAV file: {0}")]
    Wav(#[from] hound::Error),
    #[error("Failed to run ffmpeg: {0}")]
    Spawn(std::io::Error),
    #[error("ffmpeg could not convert {0}")]
    Ffmpeg(String),
    #[error("Audio conversion failed: {0}")]
    Convert(String),
    #[error("No audio samples decoded")]
    Empty,
    #[error("Audio contains NaN/Inf samples")]
    NonFinite,
}

/// Load any media file as 16kHz mono f32 samples.
///
/// WAV files that are already 16kHz mono 16-bit are read directly,
/// everything else goes through ffmpeg.
pub fn load_samples(path: &Path) -> Result<Vec<f32>, DecodeError> {
    let pcm = match read_whisper_wav(path)? {
        Some(pcm) => pcm,
        None => decode_with_ffmpeg(path)?,
    };

    if pcm.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut samples = vec![0.0f32; pcm.len()];
    whisper_rs::convert_integer_to_float_audio(&pcm, &mut samples)
        .map_err(|e| DecodeError::Convert(e.to_string()))?;

    if samples.iter().any(|s| !s.is_finite()) {
        return Err(DecodeError::NonFinite);
    }

    info!(
        "Decoded {} samples ({:.2}s of audio)",
        samples.len(),
        samples.len() as f64 / WHISPER_SAMPLE_RATE as f64
    );

    Ok(samples)
}

/// Read a WAV file if it is already in Whisper's format
fn read_whisper_wav(path: &Path) -> Result<Option<Vec<i16>>, DecodeError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if !is_wav {
        return Ok(None);
    }

    // Leave WAV flavours hound can't parse (mu-law, A-law, mislabeled files) to ffmpeg
    let reader = match hound::WavReader::open(path) {
        Ok(reader) => reader,
        Err(e @ (hound::Error::Unsupported | hound::Error::FormatError(_))) => {
            debug!("hound cannot read {:?} ({}); falling back to ffmpeg", path, e);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let spec = reader.spec();
    if spec.sample_rate != WHISPER_SAMPLE_RATE
        || spec.channels != 1
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        debug!("WAV format {:?} needs resampling", spec);
        return Ok(None);
    }

    let samples = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    Ok(Some(samples))
}

fn decode_with_ffmpeg(path: &Path) -> Result<Vec<i16>, DecodeError> {
    debug!("Decoding {:?} with ffmpeg", path);

    let mut child = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .args([
            "-ar", "16000",
            "-ac", "1",
            "-c:a", "pcm_s16le",
            "-f", "s16le", // raw samples for piping
            "pipe:1",
            "-hide_banner", "-loglevel", "error",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(DecodeError::Spawn)?;

    let mut buffer = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_end(&mut buffer)?;
    }

    let status = child.wait()?;
    if !status.success() {
        return Err(DecodeError::Ffmpeg(path.display().to_string()));
    }

    Ok(pcm_from_le_bytes(&buffer))
}

/// Interpret raw s16le bytes, dropping a trailing odd byte
fn pcm_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    let usable = bytes.len() - bytes.len() % 2;
    let mut pcm = vec![0i16; usable / 2];
    LittleEndian::read_i16_into(&bytes[..usable], &mut pcm);
    pcm
}
