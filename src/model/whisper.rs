//! Whisper.cpp integration via the whisper-rs bindings.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use whisper_rs::{
    FullParams, SamplingStrategy, SegmentCallbackData, WhisperContext, WhisperContextParameters,
    WhisperState,
};

use super::download::{download_model, ModelFile};
use super::stream::{spawn_segment_stream, SegmentSender};
use super::{
    ModelError, ModelLoader, ModelSpec, Segment, SegmentStream, SpeechModel, TranscribeRequest,
    TranscriptionInfo,
};
use crate::audio::{load_samples, WHISPER_SAMPLE_RATE};
use crate::config::{ComputeType, Device};

/// Loads ggml Whisper models, downloading them on first use
#[derive(Debug, Default, Clone, Copy)]
pub struct WhisperLoader;

impl ModelLoader for WhisperLoader {
    type Model = WhisperBackend;

    fn load(&self, spec: &ModelSpec) -> Result<WhisperBackend, ModelError> {
        let model_file = ModelFile::whisper(spec.size, spec.compute_type);
        let model_path = download_model(&model_file, &spec.models_dir)?;

        let vad_model_path = if spec.vad {
            Some(download_model(&ModelFile::silero_vad(), &spec.models_dir)?)
        } else {
            None
        };

        if spec.compute_type == ComputeType::Float32 {
            info!("float32 requested; whisper.cpp computes with the f16 weights in {}", model_file.filename);
        }

        let use_gpu = gpu_enabled(spec.device);
        info!(
            "Loading Whisper {} from {:?} (gpu: {}, threads: {})",
            spec.size, model_path, use_gpu, spec.n_threads
        );

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(use_gpu);

        let path_str = model_path
            .to_str()
            .ok_or_else(|| ModelError::Init(format!("Invalid model path: {:?}", model_path)))?;
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| ModelError::Init(format!("Failed to load model: {}", e)))?;

        info!("Whisper model loaded successfully");

        Ok(WhisperBackend {
            ctx,
            n_threads: spec.n_threads,
            vad_model_path,
        })
    }
}

/// Decide whether to offload to the GPU for the requested device
fn gpu_enabled(device: Device) -> bool {
    match device {
        Device::Cpu => false,
        Device::Auto => cfg!(feature = "cuda"),
        Device::Cuda => {
            if !cfg!(feature = "cuda") {
                warn!("Built without the `cuda` feature; running on CPU");
            }
            cfg!(feature = "cuda")
        }
    }
}

/// A loaded Whisper model
pub struct WhisperBackend {
    ctx: WhisperContext,
    n_threads: i32,
    vad_model_path: Option<PathBuf>,
}

impl SpeechModel for WhisperBackend {
    fn transcribe(
        &mut self,
        audio: &Path,
        request: &TranscribeRequest,
    ) -> Result<SegmentStream<'_>, ModelError> {
        let samples = load_samples(audio)?;
        let duration_secs = samples.len() as f64 / WHISPER_SAMPLE_RATE as f64;

        let vad_model_path = match (&self.vad_model_path, request.vad_filter) {
            (Some(path), true) => Some(
                path.to_str()
                    .ok_or_else(|| ModelError::Init(format!("Invalid VAD model path: {:?}", path)))?
                    .to_string(),
            ),
            (None, true) => {
                warn!("VAD requested but no VAD model was loaded; transcribing all audio");
                None
            }
            (_, false) => None,
        };

        let state = self
            .ctx
            .create_state()
            .map_err(|e| ModelError::Transcription(format!("Failed to create state: {}", e)))?;

        let job = InferenceJob {
            state,
            samples,
            language: request.language.clone(),
            n_threads: self.n_threads,
            vad_model_path,
        };
        let segments = spawn_segment_stream(move |sender| job.run(sender))?;

        Ok(SegmentStream {
            info: TranscriptionInfo {
                language: request.language.clone(),
                duration_secs,
            },
            segments: Box::new(segments),
        })
    }
}

/// Everything the inference thread owns
struct InferenceJob {
    state: WhisperState,
    samples: Vec<f32>,
    language: String,
    n_threads: i32,
    vad_model_path: Option<String>,
}

impl InferenceJob {
    /// Run whisper, forwarding each segment as soon as it is decoded
    fn run(mut self, sender: SegmentSender) -> Result<(), ModelError> {
        // Greedy sampling; beam search is 2-3x slower
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.n_threads);
        params.set_language(Some(self.language.as_str()));
        params.set_translate(false);

        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);

        params.enable_vad(self.vad_model_path.is_some());
        params.set_vad_model_path(self.vad_model_path.as_deref());

        params.set_segment_callback_safe_lossy(move |data: SegmentCallbackData| {
            // Timestamps are in centiseconds (1/100 second)
            sender.send(Segment {
                start: data.start_timestamp as f64 / 100.0,
                end: data.end_timestamp as f64 / 100.0,
                text: data.text,
            });
        });

        self.state
            .full(params, &self.samples)
            .map_err(|e| ModelError::Transcription(format!("Inference failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSize;

    #[test]
    fn test_cpu_never_uses_gpu() {
        assert!(!gpu_enabled(Device::Cpu));
        assert_eq!(gpu_enabled(Device::Auto), cfg!(feature = "cuda"));
        assert_eq!(gpu_enabled(Device::Cuda), cfg!(feature = "cuda"));
    }

    #[test]
    #[ignore] // Downloads the tiny model and needs ffmpeg
    fn test_transcribe_does_not_crash_on_silence() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("silence.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: WHISPER_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
        for _ in 0..WHISPER_SAMPLE_RATE * 2 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut model = WhisperLoader
            .load(&ModelSpec {
                size: ModelSize::Tiny,
                device: Device::Cpu,
                compute_type: ComputeType::Int8,
                models_dir: PathBuf::from("models/whisper"),
                n_threads: 2,
                vad: false,
            })
            .expect("Failed to load tiny model");

        let request = TranscribeRequest {
            language: "de".to_string(),
            vad_filter: false,
        };
        let stream = model.transcribe(&wav, &request).unwrap();
        assert_eq!(stream.info.duration_secs, 2.0);
        for segment in stream.segments {
            assert!(segment.is_ok());
        }
    }
}
